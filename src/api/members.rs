use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Decimal, Leg, MemberId, MemberProfile};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub national_id: Option<String>,
    pub sponsor_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub member_id: i64,
    pub member_no: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let profile = MemberProfile {
        full_name: req.full_name,
        email: req.email,
        phone: req.phone,
        national_id: req.national_id,
    };

    let member = state
        .engine
        .register(profile, MemberId::new(req.sponsor_id))
        .await?;

    Ok(Json(RegisterResponse {
        member_id: member.id.as_i64(),
        member_no: member.member_no.as_str().to_string(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub anchor_id: i64,
    pub leg: String,
}

pub async fn place(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<PlaceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let leg = Leg::from_str(&req.leg)
        .map_err(|_| AppError::BadRequest("leg must be LEFT or RIGHT".into()))?;

    state
        .engine
        .place(MemberId::new(id), MemberId::new(req.anchor_id), leg)
        .await?;

    Ok(Json(serde_json::json!({"placed": true})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSlotQuery {
    pub leg: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSlotResponse {
    pub anchor_id: i64,
    pub leg: String,
}

/// Resolve where a placement on the chosen leg would land: the open slot
/// on that leg's outer edge below the member.
pub async fn open_slot(
    Path(id): Path<i64>,
    Query(params): Query<OpenSlotQuery>,
    State(state): State<AppState>,
) -> Result<Json<OpenSlotResponse>, AppError> {
    let leg = Leg::from_str(&params.leg)
        .map_err(|_| AppError::BadRequest("leg must be LEFT or RIGHT".into()))?;

    let slot = state.engine.find_open_slot(MemberId::new(id), leg).await?;

    Ok(Json(OpenSlotResponse {
        anchor_id: slot.as_i64(),
        leg: leg.as_str().to_string(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub member_id: i64,
    pub member_no: String,
    pub full_name: String,
    pub rank: String,
    pub leg_volume_left: i64,
    pub leg_volume_right: i64,
    pub lifetime_volume_left: i64,
    pub lifetime_volume_right: i64,
    pub cash_balance: Decimal,
    pub team_size_left: i64,
    pub team_size_right: i64,
    pub direct_referral_count: i64,
    pub pending_referral_count: i64,
}

pub async fn get_summary(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let member_id = MemberId::new(id);
    let member = state
        .repo
        .get_member(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

    let max_depth = state.engine.plan().max_propagation_hops;
    let team_size_left = state.repo.team_size(member_id, Leg::Left, max_depth).await?;
    let team_size_right = state.repo.team_size(member_id, Leg::Right, max_depth).await?;
    let direct_referral_count = state.repo.direct_referral_count(member_id).await?;
    let pending_referral_count = state.repo.pending_referral_count(member_id).await?;

    Ok(Json(SummaryResponse {
        member_id: member.id.as_i64(),
        member_no: member.member_no.as_str().to_string(),
        full_name: member.full_name,
        rank: member.rank,
        leg_volume_left: member.leg_volume_left,
        leg_volume_right: member.leg_volume_right,
        lifetime_volume_left: member.lifetime_volume_left,
        lifetime_volume_right: member.lifetime_volume_right,
        cash_balance: member.cash_balance,
        team_size_left,
        team_size_right,
        direct_referral_count,
        pending_referral_count,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMemberDto {
    pub member_id: i64,
    pub member_no: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub rank: String,
    pub created_at: i64,
}

/// The member's referrals still waiting in the placement queue.
pub async fn get_pending(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingMemberDto>>, AppError> {
    let member_id = MemberId::new(id);
    if state.repo.get_member(member_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Member {} not found", id)));
    }

    let pending = state.repo.pending_referrals(member_id).await?;
    Ok(Json(
        pending
            .into_iter()
            .map(|m| PendingMemberDto {
                member_id: m.id.as_i64(),
                member_no: m.member_no.as_str().to_string(),
                full_name: m.full_name,
                email: m.email,
                phone: m.phone,
                rank: m.rank,
                created_at: m.created_at.as_i64(),
            })
            .collect(),
    ))
}
