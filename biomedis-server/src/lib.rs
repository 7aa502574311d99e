//! biomedis-server: HTTP surface for the Biomedis storefront
//!
//! Wires the database engine from `biomedis-db` into an axum application and
//! exposes health, readiness and a request-scoped session extractor for
//! route handlers.

pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;
pub mod state;
pub mod tracing_setup;

pub use config::{Environment, ServerConfig};
pub use error::{ApiError, ServerError};
pub use extractors::DbSession;
pub use server::{build_router, run_server};
pub use state::AppState;
