//! Engine construction and session acquisition
//!
//! [`create_engine`] runs once at startup and always yields a usable [`Engine`]:
//! when the requested backend cannot be built it substitutes a local SQLite file
//! and says so loudly in the logs and through [`Engine::is_fallback`].

use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::{PgConnectOptions, PgPool};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::config::{BackendKind, EngineConfig};
use crate::connection::{normalize, ConnectionSpec};
use crate::error::{DbError, Result};
use crate::session::{Session, SessionConnection, SessionCounts, SessionStats};
use crate::settings::DatabaseSettings;

/// Lock wait for the embedded store before SQLite reports `SQLITE_BUSY`.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub(crate) enum Backend {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Process-wide database handle
///
/// Cloning is cheap and shares the same pool; build one at startup and pass it
/// through application state.
#[derive(Clone)]
pub struct Engine {
    backend: Backend,
    config: Arc<EngineConfig>,
    fallback: bool,
    stats: Arc<SessionStats>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.kind())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(crate) fn from_parts(backend: Backend, config: EngineConfig, fallback: bool) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            fallback,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Build the backend named by an already-normalized URL.
    ///
    /// Networked backends connect eagerly so an unreachable host fails here
    /// rather than on the first request.
    pub async fn connect(url: &str, config: EngineConfig) -> Result<Self> {
        let kind = config.backend();
        let backend = match kind {
            BackendKind::Networked => {
                let policy = config.pool().cloned().unwrap_or_default();
                let options =
                    PgConnectOptions::from_str(url).map_err(|e| DbError::construction(kind, e))?;
                let pool = policy
                    .pool_options::<sqlx::Postgres>()
                    .connect_with(options)
                    .await
                    .map_err(|e| DbError::construction(kind, e))?;
                Backend::Postgres(pool)
            }
            BackendKind::Embedded => {
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(|e| DbError::construction(kind, e))?;
                let pool = SqlitePoolOptions::new()
                    .connect_with(embedded_options(options))
                    .await
                    .map_err(|e| DbError::construction(kind, e))?;
                Backend::Sqlite(pool)
            }
        };

        Ok(Self::from_parts(backend, config, false))
    }

    /// Degraded local store at `path`.
    ///
    /// The pool opens lazily, so building it cannot fail; problems with the file
    /// show up on first use and in the connectivity probe.
    pub fn fallback(path: &Path) -> Self {
        let options = SqliteConnectOptions::new().filename(path);
        let pool = SqlitePoolOptions::new().connect_lazy_with(embedded_options(options));
        Self::from_parts(Backend::Sqlite(pool), EngineConfig::embedded(path), true)
    }

    pub fn kind(&self) -> BackendKind {
        self.config.backend()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True when the requested backend could not be built and the local store is in use.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Physical connections currently open, idle or in use.
    pub fn pool_size(&self) -> u32 {
        match &self.backend {
            Backend::Postgres(pool) => pool.size(),
            Backend::Sqlite(pool) => pool.size(),
        }
    }

    pub fn session_counts(&self) -> SessionCounts {
        self.stats.snapshot()
    }

    /// Acquire a session for one unit of work.
    ///
    /// Waits while the pool is exhausted; gives up with [`DbError::PoolTimeout`]
    /// once the acquire timeout elapses.
    pub async fn session(&self) -> Result<Session> {
        let conn = match &self.backend {
            Backend::Postgres(pool) => SessionConnection::Postgres(pool.acquire().await?),
            Backend::Sqlite(pool) => SessionConnection::Sqlite(pool.acquire().await?),
        };
        Ok(Session::new(conn, Arc::clone(&self.stats)))
    }

    /// Run `work` with a session that is released when it finishes, whatever the outcome.
    ///
    /// ```ignore
    /// let rows = engine
    ///     .scoped(|session| Box::pin(async move { session.execute("DELETE FROM carts").await }))
    ///     .await?;
    /// ```
    pub async fn scoped<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, std::result::Result<T, E>>,
        E: From<DbError>,
    {
        let mut session = self.session().await?;
        let result = work(&mut session).await;
        session.close();
        result
    }

    /// Close every pooled connection. Call once at shutdown.
    pub async fn close(&self) {
        match &self.backend {
            Backend::Postgres(pool) => pool.close().await,
            Backend::Sqlite(pool) => pool.close().await,
        }
        tracing::info!(backend = %self.kind(), "database engine closed");
    }

    pub fn is_closed(&self) -> bool {
        match &self.backend {
            Backend::Postgres(pool) => pool.is_closed(),
            Backend::Sqlite(pool) => pool.is_closed(),
        }
    }
}

/// WAL journal and a busy timeout let many tasks share one file without
/// extra locking at the handle level.
fn embedded_options(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .create_if_missing(true)
}

/// Build the process engine from settings.
///
/// Never fails: any construction error is logged and replaced by the local
/// fallback store named in `settings`.
pub async fn create_engine(settings: &DatabaseSettings) -> Engine {
    with_fallback(try_create_engine(settings), settings.fallback_path()).await
}

/// Build the engine requested by `settings` without falling back.
pub async fn try_create_engine(settings: &DatabaseSettings) -> Result<Engine> {
    let raw = settings
        .url()
        .filter(|url| !url.trim().is_empty())
        .ok_or(DbError::MissingUrl)?;

    let url = normalize(raw.trim());
    let config = EngineConfig::for_url(&url, settings.pool(), settings.fallback_path())?;

    let target = match ConnectionSpec::parse(&url) {
        Ok(spec) => spec.redacted(),
        Err(_) => config.backend().to_string(),
    };
    tracing::info!(backend = %config.backend(), target = %target, "connecting to database");

    let engine = Engine::connect(&url, config).await?;
    tracing::info!(backend = %engine.kind(), "database engine ready");
    Ok(engine)
}

async fn with_fallback<F>(attempt: F, fallback_path: &Path) -> Engine
where
    F: Future<Output = Result<Engine>>,
{
    match attempt.await {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(
                error = %err,
                fallback = %fallback_path.display(),
                "database engine construction failed; serving from local fallback store"
            );
            Engine::fallback(fallback_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolPolicy;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    async fn bounded_sqlite_engine(dir: &Path, policy: PoolPolicy) -> Engine {
        let options = SqliteConnectOptions::new()
            .filename(dir.join("bounded.db"))
            .create_if_missing(true);
        let pool = policy
            .pool_options::<sqlx::Sqlite>()
            .connect_with(options)
            .await
            .unwrap();
        Engine::from_parts(
            Backend::Sqlite(pool),
            EngineConfig::networked(policy, dir.join("fallback.db")),
            false,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_never_exceeds_size_plus_overflow() {
        let dir = tempdir().unwrap();
        let policy = PoolPolicy {
            size: 5,
            max_overflow: 10,
            acquire_timeout: Duration::from_secs(20),
            ..PoolPolicy::default()
        };
        let engine = bounded_sqlite_engine(dir.path(), policy).await;

        let held = Arc::new(AtomicUsize::new(0));
        let peak_held = Arc::new(AtomicUsize::new(0));
        let peak_physical = Arc::new(AtomicUsize::new(0));
        let saturated = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let engine = engine.clone();
                let held = Arc::clone(&held);
                let peak_held = Arc::clone(&peak_held);
                let peak_physical = Arc::clone(&peak_physical);
                let saturated = Arc::clone(&saturated);
                tokio::spawn(async move {
                    let mut session = engine.session().await.expect("session acquire failed");
                    let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                    peak_held.fetch_max(now, Ordering::SeqCst);
                    peak_physical.fetch_max(engine.pool_size() as usize, Ordering::SeqCst);

                    session.ping().await.expect("ping failed");

                    // Hold until the pool is saturated so the remaining tasks must queue.
                    let _ = tokio::time::timeout(Duration::from_secs(10), async {
                        while held.load(Ordering::SeqCst) < 15
                            && !saturated.load(Ordering::SeqCst)
                        {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                        }
                    })
                    .await;
                    saturated.store(true, Ordering::SeqCst);

                    held.fetch_sub(1, Ordering::SeqCst);
                    session.close();
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("task panicked");
        }

        assert_eq!(peak_held.load(Ordering::SeqCst), 15);
        assert!(peak_physical.load(Ordering::SeqCst) <= 15);
        assert!(engine.pool_size() <= 15);

        let counts = engine.session_counts();
        assert_eq!(counts.opened, 20);
        assert_eq!(counts.closed, 20);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out_as_transient_error() {
        let dir = tempdir().unwrap();
        let policy = PoolPolicy {
            size: 1,
            max_overflow: 0,
            acquire_timeout: Duration::from_millis(200),
            ..PoolPolicy::default()
        };
        let engine = bounded_sqlite_engine(dir.path(), policy).await;

        let held = engine.session().await.unwrap();
        let err = engine.session().await.unwrap_err();
        assert!(matches!(err, DbError::PoolTimeout));
        assert!(err.is_transient());

        held.close();
        assert!(engine.session().await.is_ok());
    }

    #[tokio::test]
    async fn fallback_engine_is_embedded_and_usable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallback.db");
        let engine = Engine::fallback(&path);

        assert!(engine.is_fallback());
        assert_eq!(engine.kind(), BackendKind::Embedded);
        assert!(engine.config().pool().is_none());

        let mut session = engine.session().await.unwrap();
        session.ping().await.unwrap();
        assert!(session.as_sqlite().is_some());
        assert!(session.as_postgres().is_none());
        session.close();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn closed_engine_rejects_sessions() {
        let dir = tempdir().unwrap();
        let engine = Engine::fallback(&dir.path().join("closed.db"));
        engine.close().await;

        assert!(engine.is_closed());
        assert!(matches!(
            engine.session().await.unwrap_err(),
            DbError::EngineClosed
        ));
    }
}
