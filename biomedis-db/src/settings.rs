//! Database settings loaded from the environment
//!
//! Environment variables:
//!   DATABASE_URL                  # Connection string (absent => fallback store)
//!   DATABASE_FALLBACK_PATH        # Fallback SQLite file (default: ./biomedis_fallback.db)
//!   DATABASE_POOL_SIZE            # Persistent pool connections (default: 5)
//!   DATABASE_MAX_OVERFLOW         # Extra connections under load (default: 10)
//!   DATABASE_PRE_PING             # Validate connections before use (default: true)
//!   DATABASE_POOL_RECYCLE_SECS    # Max connection age (default: 300)
//!   DATABASE_POOL_TIMEOUT_SECS    # Max wait for a connection (default: 30)
//!   DATABASE_PROBE_TIMEOUT_SECS   # Connectivity check deadline (default: 5)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::config::PoolPolicy;
use crate::probe::DEFAULT_PROBE_TIMEOUT;

/// Default location of the degraded local store.
pub const DEFAULT_FALLBACK_PATH: &str = "biomedis_fallback.db";

/// Everything the engine factory and prober need, read once at startup
#[derive(Clone)]
pub struct DatabaseSettings {
    url: Option<String>,
    pool: PoolPolicy,
    fallback_path: PathBuf,
    probe_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            pool: PoolPolicy::default(),
            fallback_path: PathBuf::from(DEFAULT_FALLBACK_PATH),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

// The URL carries credentials; keep it out of debug output.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("pool", &self.pool)
            .field("fallback_path", &self.fallback_path)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl DatabaseSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let pool = PoolPolicy {
            size: parse_or("DATABASE_POOL_SIZE", &lookup, defaults.pool.size),
            max_overflow: parse_or("DATABASE_MAX_OVERFLOW", &lookup, defaults.pool.max_overflow),
            pre_ping: parse_or("DATABASE_PRE_PING", &lookup, defaults.pool.pre_ping),
            recycle: secs_or("DATABASE_POOL_RECYCLE_SECS", &lookup, defaults.pool.recycle),
            acquire_timeout: secs_or(
                "DATABASE_POOL_TIMEOUT_SECS",
                &lookup,
                defaults.pool.acquire_timeout,
            ),
        };

        Self {
            url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            pool,
            fallback_path: lookup("DATABASE_FALLBACK_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.fallback_path),
            probe_timeout: secs_or("DATABASE_PROBE_TIMEOUT_SECS", &lookup, defaults.probe_timeout),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_pool(mut self, pool: PoolPolicy) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_path = path.into();
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Raw connection string as supplied, before normalization
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn pool(&self) -> &PoolPolicy {
        &self.pool
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback_path
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr + fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = ?default, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

fn secs_or<F>(key: &str, lookup: &F, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    Duration::from_secs(parse_or(key, lookup, default.as_secs()))
}
