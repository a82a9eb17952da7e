//! # threads-db-sqlite
//!
//! SQLite implementation of the `threads-core` ports (`ThreadRepo`,
//! `CommunityRepo`, `UserRepo`).
//!
//! The repo owns one connection pool, opened once by the binary and shared
//! behind an `Arc`. Every operation that touches more than one row set runs in
//! a single transaction.
//!
//! SQLite admits one writer at a time, and a deferred transaction that reads
//! before it writes fails with `SQLITE_BUSY` instead of waiting when another
//! connection committed in between. Write transactions are
//! serialized through `writer` before they begin; plain reads never take it.

mod communities;
mod rows;
mod schema;
mod threads;
mod users;

use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use threads_core::error::{AppError, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteThreadsRepo {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl SqliteThreadsRepo {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_max_connections(url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn with_max_connections(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            // Readers keep going while the single writer commits
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so an in-memory
        // repo keeps exactly one connection alive for its whole lifetime.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        schema::apply(&pool).await?;
        log::info!("sqlite store ready at {}", url);

        Ok(Self { pool, writer: Arc::new(Mutex::new(())) })
    }

    async fn conn(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool.acquire().await.map_err(db_error("acquire connection"))
    }

    /// Starts a write transaction once no other write transaction of this
    /// repo is open.
    async fn begin(&self) -> Result<WriteTx> {
        let writer = self.writer.clone().lock_owned().await;
        let tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;
        Ok(WriteTx { tx, _writer: writer })
    }
}

/// A transaction holding the repo's write slot. Dropping it without
/// `commit` rolls back, then frees the slot.
pub(crate) struct WriteTx {
    tx: Transaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.tx
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

async fn commit(tx: WriteTx) -> Result<()> {
    tx.tx.commit().await.map_err(db_error("commit transaction"))
}

/// Maps a sqlx failure to an `AppError`, tagging it with what was being done.
/// Unique-constraint violations surface as `Conflict`.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return AppError::Conflict(format!("{context}: {}", db.message()));
            }
        }
        log::error!("{context}: {err}");
        AppError::Internal(format!("{context}: {err}"))
    }
}

/// Rejects content that is blank once trimmed. Length limits belong to the
/// request layer.
fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::ValidationError("content is required".into()));
    }
    Ok(())
}
