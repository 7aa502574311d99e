//! Request-scoped sessions
//!
//! A [`Session`] owns one pooled connection for the duration of a unit of work.
//! Release happens in `Drop`, so it runs on normal completion, `?` propagation,
//! panic unwinding and future cancellation alike. `close` consumes the session,
//! which makes double-close and use-after-release compile errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Postgres, Sqlite, SqliteConnection};

use crate::config::BackendKind;
use crate::error::Result;

/// Open/close counters shared by an engine and its sessions
#[derive(Debug, Default)]
pub(crate) struct SessionStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl SessionStats {
    fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> SessionCounts {
        SessionCounts {
            opened: self.opened.load(Ordering::SeqCst),
            closed: self.closed.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time view of session activity on an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    pub opened: u64,
    pub closed: u64,
}

impl SessionCounts {
    /// Sessions currently held by units of work
    pub fn active(&self) -> u64 {
        self.opened.saturating_sub(self.closed)
    }
}

pub(crate) enum SessionConnection {
    Postgres(PoolConnection<Postgres>),
    Sqlite(PoolConnection<Sqlite>),
}

/// Logical handle for one unit of work
///
/// Not `Clone`; hand it out by `&mut` and let it drop at the end of the scope.
pub struct Session {
    conn: SessionConnection,
    stats: Arc<SessionStats>,
}

impl Session {
    pub(crate) fn new(conn: SessionConnection, stats: Arc<SessionStats>) -> Self {
        stats.record_open();
        Self { conn, stats }
    }

    pub fn backend(&self) -> BackendKind {
        match self.conn {
            SessionConnection::Postgres(_) => BackendKind::Networked,
            SessionConnection::Sqlite(_) => BackendKind::Embedded,
        }
    }

    /// Run a no-op query to prove the connection is usable.
    pub async fn ping(&mut self) -> Result<()> {
        self.execute("SELECT 1").await.map(|_| ())
    }

    /// Execute a single statement, returning the number of rows affected.
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        let rows = match &mut self.conn {
            SessionConnection::Postgres(conn) => {
                sqlx::query(sql).execute(&mut **conn).await?.rows_affected()
            }
            SessionConnection::Sqlite(conn) => {
                sqlx::query(sql).execute(&mut **conn).await?.rows_affected()
            }
        };
        Ok(rows)
    }

    /// Underlying PostgreSQL connection, for query code written against sqlx.
    pub fn as_postgres(&mut self) -> Option<&mut PgConnection> {
        match &mut self.conn {
            SessionConnection::Postgres(conn) => Some(&mut **conn),
            SessionConnection::Sqlite(_) => None,
        }
    }

    /// Underlying SQLite connection, for query code written against sqlx.
    pub fn as_sqlite(&mut self) -> Option<&mut SqliteConnection> {
        match &mut self.conn {
            SessionConnection::Sqlite(conn) => Some(&mut **conn),
            SessionConnection::Postgres(_) => None,
        }
    }

    /// Release the session before the end of its scope.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The pooled connection returns to the pool when `conn` drops right after this.
        self.stats.record_close();
        tracing::trace!(backend = %self.backend(), "session released");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_never_underflows() {
        let counts = SessionCounts {
            opened: 2,
            closed: 2,
        };
        assert_eq!(counts.active(), 0);

        let counts = SessionCounts {
            opened: 3,
            closed: 1,
        };
        assert_eq!(counts.active(), 2);
    }

    #[test]
    fn stats_snapshot_tracks_counters() {
        let stats = SessionStats::default();
        stats.record_open();
        stats.record_open();
        stats.record_close();
        assert_eq!(
            stats.snapshot(),
            SessionCounts {
                opened: 2,
                closed: 1
            }
        );
    }
}
