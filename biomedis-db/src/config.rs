//! Engine configuration - backend family and pool policy
//!
//! An [`EngineConfig`] can only be built through its constructors, which keep
//! the pool policy present for networked backends and absent for embedded ones.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use sqlx::pool::PoolOptions;

use crate::error::{DbError, Result};

/// Persistent connections kept by a networked pool.
pub const DEFAULT_POOL_SIZE: u32 = 5;

/// Extra connections a networked pool may open under load.
pub const DEFAULT_MAX_OVERFLOW: u32 = 10;

/// Physical connections older than this are retired and replaced.
pub const DEFAULT_POOL_RECYCLE: Duration = Duration::from_secs(300);

/// How long a unit of work waits for a connection when the pool is exhausted.
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle time after which connections above the base size are closed.
const OVERFLOW_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend family, derived from the connection string scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single-file SQLite store
    Embedded,
    /// PostgreSQL over the network
    Networked,
}

impl BackendKind {
    /// Classify a connection string by its scheme.
    ///
    /// A SQLAlchemy-style driver suffix (`postgresql+psycopg2`) is ignored.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = scheme_of(url).ok_or_else(|| DbError::malformed("missing scheme"))?;
        match base_scheme(scheme).to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Embedded),
            "postgres" | "postgresql" => Ok(Self::Networked),
            _ => Err(DbError::unsupported_scheme(scheme)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Networked => "networked",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text before the first `:`, if it looks like a URL scheme.
pub(crate) fn scheme_of(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Scheme with any `+driver` suffix removed.
pub(crate) fn base_scheme(scheme: &str) -> &str {
    scheme.split('+').next().unwrap_or(scheme)
}

/// Pool bounds and connection hygiene for networked backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    /// Connections kept open between bursts
    pub size: u32,
    /// Additional connections allowed while all base connections are busy
    pub max_overflow: u32,
    /// Validate a pooled connection before handing it to a session
    pub pre_ping: bool,
    /// Maximum age of a physical connection
    pub recycle: Duration,
    /// Maximum wait for a connection when the pool is exhausted
    pub acquire_timeout: Duration,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            max_overflow: DEFAULT_MAX_OVERFLOW,
            pre_ping: true,
            recycle: DEFAULT_POOL_RECYCLE,
            acquire_timeout: DEFAULT_POOL_TIMEOUT,
        }
    }
}

impl PoolPolicy {
    /// Upper bound on concurrently open physical connections.
    pub fn max_connections(&self) -> u32 {
        self.size.saturating_add(self.max_overflow).max(1)
    }

    /// Translate the policy into sqlx pool options.
    ///
    /// `size` becomes the warm minimum, overflow connections are closed once
    /// idle, pre-ping maps to `test_before_acquire` and recycle to `max_lifetime`.
    pub fn pool_options<DB: sqlx::Database>(&self) -> PoolOptions<DB> {
        PoolOptions::<DB>::new()
            .max_connections(self.max_connections())
            .min_connections(self.size.min(self.max_connections()))
            .test_before_acquire(self.pre_ping)
            .max_lifetime(self.recycle)
            .idle_timeout(OVERFLOW_IDLE_TIMEOUT)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Configuration an [`Engine`](crate::Engine) is bound to for its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    backend: BackendKind,
    pool: Option<PoolPolicy>,
    fallback_path: PathBuf,
}

impl EngineConfig {
    /// Embedded store: no pool bounds, the driver's defaults apply.
    pub fn embedded(fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Embedded,
            pool: None,
            fallback_path: fallback_path.into(),
        }
    }

    /// Networked backend with an explicit pool policy.
    pub fn networked(policy: PoolPolicy, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Networked,
            pool: Some(policy),
            fallback_path: fallback_path.into(),
        }
    }

    /// Pick the configuration matching the scheme of `url`.
    pub fn for_url(url: &str, policy: &PoolPolicy, fallback_path: &Path) -> Result<Self> {
        Ok(match BackendKind::from_url(url)? {
            BackendKind::Embedded => Self::embedded(fallback_path),
            BackendKind::Networked => Self::networked(policy.clone(), fallback_path),
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Pool policy; always `Some` for networked backends, `None` for embedded.
    pub fn pool(&self) -> Option<&PoolPolicy> {
        self.pool.as_ref()
    }

    /// File used when the requested backend cannot be built.
    pub fn fallback_path(&self) -> &Path {
        &self.fallback_path
    }
}
