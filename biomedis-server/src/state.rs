//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use biomedis_db::Engine;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: Engine,
    config: ServerConfig,
    probe_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Engine, config: ServerConfig, probe_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                engine,
                config,
                probe_timeout,
            }),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Deadline for the health endpoint's connectivity check
    pub fn probe_timeout(&self) -> Duration {
        self.inner.probe_timeout
    }
}

impl FromRef<AppState> for Engine {
    fn from_ref(state: &AppState) -> Self {
        state.engine().clone()
    }
}
