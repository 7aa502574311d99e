//! Route handlers
//!
//! - root: service banner
//! - health: health check and readiness endpoints

pub mod health;
pub mod root;
