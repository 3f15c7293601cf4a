use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::AppState;
use crate::domain::{Leg, Member, MemberId};
use crate::error::AppError;

const DEFAULT_DEPTH: u32 = 3;
const MAX_DEPTH: u32 = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    pub depth: Option<u32>,
}

/// One node of the placement-tree view. Unoccupied child positions are
/// rendered as explicit vacant slots so a client can offer them for
/// placement.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub vacant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    pub leg: Option<String>,
    pub leg_volume_left: Option<i64>,
    pub leg_volume_right: Option<i64>,
    pub children: Vec<TreeNode>,
}

pub async fn get_tree(
    Path(id): Path<i64>,
    Query(params): Query<TreeQuery>,
    State(state): State<AppState>,
) -> Result<Json<TreeNode>, AppError> {
    let depth = params.depth.unwrap_or(DEFAULT_DEPTH).min(MAX_DEPTH);
    let member_id = MemberId::new(id);

    let rows = state.repo.subtree(member_id, depth).await?;
    match assemble_tree(member_id, depth, &rows) {
        Some(tree) => Ok(Json(tree)),
        None => Err(AppError::NotFound(format!("Member {} not found", id))),
    }
}

/// Assemble the nested view from the flat depth-annotated subtree rows.
/// Returns None when the rows do not contain the requested root.
pub(crate) fn assemble_tree(
    root: MemberId,
    max_depth: u32,
    rows: &[(Member, u32)],
) -> Option<TreeNode> {
    let mut by_slot: HashMap<(MemberId, Leg), &Member> = HashMap::new();
    let mut depths: HashMap<MemberId, u32> = HashMap::new();
    for (member, depth) in rows {
        depths.insert(member.id, *depth);
        if let (Some(parent), Some(leg)) = (member.placement_parent_id, member.leg) {
            by_slot.insert((parent, leg), member);
        }
    }

    let root_member = rows.iter().find(|(m, _)| m.id == root).map(|(m, _)| m)?;

    Some(build_node(root_member, max_depth, &by_slot, &depths))
}

fn build_node(
    member: &Member,
    max_depth: u32,
    by_slot: &HashMap<(MemberId, Leg), &Member>,
    depths: &HashMap<MemberId, u32>,
) -> TreeNode {
    let depth = depths.get(&member.id).copied().unwrap_or(0);

    let children = if depth < max_depth {
        [Leg::Left, Leg::Right]
            .into_iter()
            .map(|leg| match by_slot.get(&(member.id, leg)) {
                Some(child) => build_node(child, max_depth, by_slot, depths),
                None => vacant_slot(leg),
            })
            .collect()
    } else {
        Vec::new()
    };

    TreeNode {
        vacant: false,
        member_id: Some(member.id.as_i64()),
        member_no: Some(member.member_no.as_str().to_string()),
        full_name: Some(member.full_name.clone()),
        rank: Some(member.rank.clone()),
        leg: member.leg.map(|l| l.as_str().to_string()),
        leg_volume_left: Some(member.leg_volume_left),
        leg_volume_right: Some(member.leg_volume_right),
        children,
    }
}

fn vacant_slot(leg: Leg) -> TreeNode {
    TreeNode {
        vacant: true,
        member_id: None,
        member_no: None,
        full_name: None,
        rank: None,
        leg: Some(leg.as_str().to_string()),
        leg_volume_left: None,
        leg_volume_right: None,
        children: Vec::new(),
    }
}
