//! Custom Axum extractors

use std::ops::{Deref, DerefMut};

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use biomedis_db::{Engine, Session};

use super::error::ApiError;

/// Database session for the current request
///
/// Acquired before the handler runs and released when the handler returns,
/// whether it succeeds, fails or is cancelled.
pub struct DbSession(pub Session);

impl<S> FromRequestParts<S> for DbSession
where
    Engine: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let engine = Engine::from_ref(state);
        let session = engine.session().await?;
        Ok(Self(session))
    }
}

impl Deref for DbSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

impl DerefMut for DbSession {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.0
    }
}
