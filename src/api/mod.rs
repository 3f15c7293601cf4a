pub mod health;
pub mod members;
pub mod statement;
pub mod tree;
pub mod volume;

use crate::db::Repository;
use crate::engine::CompEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub engine: Arc<CompEngine>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, engine: Arc<CompEngine>) -> Self {
        Self { repo, engine }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/members", post(members::register))
        .route("/v1/members/:id/placement", post(members::place))
        .route("/v1/members/:id/open-slot", get(members::open_slot))
        .route("/v1/members/:id/summary", get(members::get_summary))
        .route("/v1/members/:id/pending", get(members::get_pending))
        .route("/v1/members/:id/statement", get(statement::get_statement))
        .route("/v1/members/:id/tree", get(tree::get_tree))
        .route("/v1/volume-events", post(volume::record_volume_event))
        .layer(cors)
        .with_state(state)
}
