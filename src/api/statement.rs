use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{Decimal, MemberId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub member_id: i64,
    pub entry_count: i64,
    pub entries: Vec<LedgerEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub amount: Decimal,
    pub category: String,
    pub note: String,
    pub created_at: i64,
}

/// A member's earnings statement: every ledger entry, newest first.
pub async fn get_statement(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<StatementResponse>, AppError> {
    let member_id = MemberId::new(id);
    if state.repo.get_member(member_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Member {} not found", id)));
    }

    let entries = state.repo.list_ledger(member_id).await?;
    let entry_count = entries.len() as i64;
    let entries = entries
        .into_iter()
        .map(|e| LedgerEntryDto {
            amount: e.amount,
            category: e.category.as_str().to_string(),
            note: e.note,
            created_at: e.created_at.as_i64(),
        })
        .collect();

    Ok(Json(StatementResponse {
        member_id: id,
        entry_count,
        entries,
    }))
}
