//! biomedis-db: database connectivity for the Biomedis storefront
//!
//! Turns an environment-supplied connection string into a pooled, fault-tolerant
//! [`Engine`] and hands out request-scoped [`Session`]s.
//!
//! - [`connection`]: parse `DATABASE_URL` and re-encode unsafe password characters
//! - [`engine`]: build the engine once at startup, falling back to a local store
//! - [`session`]: sessions released on every exit path
//! - [`probe`]: boolean liveness check for startup and health endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! let settings = DatabaseSettings::from_env();
//! let engine = create_engine(&settings).await;
//!
//! if !probe::check_connectivity(&engine).await {
//!     tracing::warn!("database unreachable at startup");
//! }
//!
//! let mut session = engine.session().await?;
//! session.ping().await?;
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod probe;
pub mod session;
pub mod settings;

pub use config::{BackendKind, EngineConfig, PoolPolicy};
pub use connection::{normalize, ConnectionSpec};
pub use engine::{create_engine, try_create_engine, Engine};
pub use error::{DbError, Result};
pub use probe::{check_connectivity, check_connectivity_within};
pub use session::{Session, SessionCounts};
pub use settings::DatabaseSettings;
