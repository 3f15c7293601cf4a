use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DuplicateContact(_) => AppError::Conflict(err.to_string()),
            EngineError::AlreadyPlaced(_) => AppError::Conflict(err.to_string()),
            EngineError::SlotOccupied(_, _) => AppError::Conflict(err.to_string()),
            EngineError::AnchorNotFound(_) => AppError::NotFound(err.to_string()),
            EngineError::MemberNotFound(_) => AppError::NotFound(err.to_string()),
            EngineError::SponsorNotFound(_) => AppError::NotFound(err.to_string()),
            EngineError::InvalidVolume(_) => AppError::BadRequest(err.to_string()),
            EngineError::DataIntegrity(_) => AppError::Internal(err.to_string()),
            EngineError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
