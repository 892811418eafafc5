// crates/db/src/lib.rs
// SQLite job ledger for dbt-jobs.

mod migrations;
mod queries;

pub use queries::jobs::JobRecord;

use dbt_jobs_core::JobStatus;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default pool size, matching one connection per concurrent request slot.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long a caller waits for a pooled connection before the ledger is
/// reported unavailable.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Job ledger unavailable: {0}")]
    Unavailable(sqlx::Error),

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),

    #[error("Invalid status transition to '{0}'")]
    InvalidTransition(JobStatus),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DbError::Unavailable(e),
            other => DbError::Sqlx(other),
        }
    }
}

impl DbError {
    /// Whether the failure means the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
///
/// Cloning shares the pool. Every query borrows one connection for the
/// duration of a single statement and returns it to the pool afterwards,
/// including on error.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        Self::with_max_connections(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Like [`Database::new`] with an explicit pool size.
    pub async fn with_max_connections(path: &Path, max_connections: u32) -> DbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        info!(max_connections, "Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database. Without this, each connection gets its own
    /// separate database and concurrent requests would miss each other's rows.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `~/.cache/dbt-jobs/dbt-jobs.db`
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Close the pool, waiting for checked-out connections to come back.
    /// Later queries fail with [`DbError::Unavailable`].
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already been
    /// applied, so each statement runs exactly once per database.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Returns the default database path: `~/.cache/dbt-jobs/dbt-jobs.db`
pub fn default_db_path() -> DbResult<PathBuf> {
    dbt_jobs_core::paths::db_path().ok_or(DbError::NoCacheDir)
}
