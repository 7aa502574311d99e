//! Service banner

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::config::Environment;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub environment: Environment,
}

/// GET /
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Biomedis lab equipment API is running!",
        environment: state.config().environment,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}
