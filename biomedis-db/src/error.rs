//! Structured error types for biomedis-db.
//!
//! Each variant carries its own recovery policy:
//! - malformed connection strings are passed through unmodified by the normalizer
//! - construction failures (`MissingUrl`, `UnsupportedScheme`, `EngineConstruction`)
//!   are absorbed by the engine factory's one-time fallback
//! - `PoolTimeout` is transient and surfaces to the caller
//! - everything the prober sees becomes `false`

use std::time::Duration;

use thiserror::Error;

use crate::config::BackendKind;

/// Main error type for database connectivity
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection string could not be split into its components
    #[error("Malformed connection string: {reason}")]
    MalformedConnectionString { reason: String },

    /// No connection string was supplied
    #[error("DATABASE_URL is not set")]
    MissingUrl,

    /// Scheme does not name a backend family we can build
    #[error("Unsupported database scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// Driver refused the options or the initial connect failed
    #[error("Failed to construct {backend} engine: {source}")]
    EngineConstruction {
        backend: BackendKind,
        #[source]
        source: sqlx::Error,
    },

    /// Every pooled connection stayed busy past the acquire timeout
    #[error("Timed out waiting for a pooled connection")]
    PoolTimeout,

    /// Engine was closed at shutdown
    #[error("Database engine is closed")]
    EngineClosed,

    /// Liveness query did not finish in time
    #[error("Connectivity check timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// Any other driver error
    #[error("Database error: {0}")]
    Sqlx(#[source] sqlx::Error),
}

/// Result type alias for biomedis-db operations
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Create a malformed connection string error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedConnectionString {
            reason: reason.into(),
        }
    }

    /// Create an unsupported scheme error
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Create an engine construction error
    pub fn construction(backend: BackendKind, source: sqlx::Error) -> Self {
        Self::EngineConstruction { backend, source }
    }

    /// True for conditions a caller should retry later rather than treat as fatal
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PoolTimeout | Self::ProbeTimeout(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::EngineClosed,
            other => Self::Sqlx(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::malformed("missing '://' separator");
        assert_eq!(
            err.to_string(),
            "Malformed connection string: missing '://' separator"
        );

        let err = DbError::unsupported_scheme("mysql");
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn test_pool_errors_map_to_dedicated_variants() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolTimeout
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::EngineClosed
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::Sqlx(_)
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(DbError::PoolTimeout.is_transient());
        assert!(DbError::ProbeTimeout(Duration::from_secs(5)).is_transient());
        assert!(!DbError::MissingUrl.is_transient());
    }
}
