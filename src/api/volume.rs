use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{Decimal, MemberId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEventRequest {
    pub member_id: i64,
    pub volume_units: i64,
    /// Sale amount in currency; bookkeeping only, never drives the math.
    pub monetary_value: Option<Decimal>,
}

/// Record a finalized volume event (an approved order) and propagate it
/// up the placement tree.
pub async fn record_volume_event(
    State(state): State<AppState>,
    Json(req): Json<VolumeEventRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .engine
        .record_volume_event(
            MemberId::new(req.member_id),
            req.volume_units,
            req.monetary_value.unwrap_or_else(Decimal::zero),
        )
        .await?;

    Ok(Json(serde_json::json!({"recorded": true})))
}
