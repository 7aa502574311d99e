//! Connectivity probe
//!
//! Answers "is the database reachable" as a plain boolean. Failures are logged
//! here and never propagate.

use std::time::Duration;

use crate::engine::Engine;
use crate::error::{DbError, Result};

/// Deadline for one liveness check.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Check liveness with the default deadline.
pub async fn check_connectivity(engine: &Engine) -> bool {
    check_connectivity_within(engine, DEFAULT_PROBE_TIMEOUT).await
}

/// Acquire a session, run `SELECT 1`, release the session.
///
/// Returns `false` on any failure: acquire timeout, network or auth errors,
/// or the probe running past `timeout`.
pub async fn check_connectivity_within(engine: &Engine, timeout: Duration) -> bool {
    match ping(engine, timeout).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                error = %err,
                backend = %engine.kind(),
                fallback = engine.is_fallback(),
                "database connectivity check failed"
            );
            false
        }
    }
}

async fn ping(engine: &Engine, timeout: Duration) -> Result<()> {
    let check = engine.scoped(|session| Box::pin(async move { session.ping().await }));
    tokio::time::timeout(timeout, check)
        .await
        .map_err(|_| DbError::ProbeTimeout(timeout))?
}
