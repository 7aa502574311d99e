//! Health and readiness endpoints
//!
//! `/health` always answers 200 and reports reachability in the body;
//! `/ready` answers 503 when no session can be obtained.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use biomedis_db::{probe, BackendKind};
use serde::Serialize;

use crate::config::Environment;
use crate::error::ApiError;
use crate::extractors::DbSession;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the database answers, `degraded` otherwise
    pub status: &'static str,
    pub environment: Environment,
    pub version: &'static str,
    pub database: DatabaseHealth,
    /// Whether the static asset directory exists
    pub static_dir: bool,
    /// Whether the templates directory exists
    pub templates_dir: bool,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub backend: BackendKind,
    /// True when serving from the local fallback store
    pub fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.engine();
    let connected = probe::check_connectivity_within(engine, state.probe_timeout()).await;
    let config = state.config();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        environment: config.environment,
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth {
            connected,
            backend: engine.kind(),
            fallback: engine.is_fallback(),
        },
        static_dir: config.static_dir.is_dir(),
        templates_dir: config.templates_dir.is_dir(),
    })
}

/// GET /ready
async fn ready(mut session: DbSession) -> Result<Json<ReadyResponse>, ApiError> {
    session.ping().await.map_err(ApiError::Unavailable)?;
    Ok(Json(ReadyResponse { status: "ready" }))
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}
