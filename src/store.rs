//! SQLite persistence for the folder/bookmark tree.
//!
//! [`Store`] is the only writer of durable state. Every mutating call runs in
//! a single SQLite transaction that either commits completely or rolls back,
//! so a half-applied change (a parent pointer moved without its counters
//! being recomputed, for example) is never observable.
//!
//! Write transactions are also serialized in-process by a writer gate. Reads
//! go straight to the pool and see the last committed state.
//!
//! Operations that must combine several writes atomically (the mutator's
//! "create folder and bump the parent's counter", say) open a [`StoreTxn`]
//! with [`Store::begin`] and commit it themselves.

mod bookmarks;
mod folders;
mod schema;
mod tags;

use crate::config::StoreConfig;
use crate::error::BkmResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

/// An open write transaction.
///
/// Holds the store's writer gate until it is committed or dropped. Dropping
/// it without calling [`StoreTxn::commit`] rolls every change back.
pub struct StoreTxn<'a> {
    // Declared before the gate so the rollback is issued before the gate opens.
    tx: Transaction<'static, Sqlite>,
    _gate: MutexGuard<'a, ()>,
}

impl Store {
    /// Opens (creating if needed) the database described by `config`.
    ///
    /// Creates the parent directory and the schema if they are missing and
    /// inserts the root folder into an empty folder table.
    pub async fn open(config: &StoreConfig) -> BkmResult<Self> {
        let path = &config.database_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "opened bookmark database");

        Self::connect(pool).await
    }

    /// Wraps an existing pool and initializes the schema.
    ///
    /// The pool's connections must have foreign keys enabled (the `sqlx`
    /// default) or cascading deletes will not happen.
    pub async fn connect(pool: SqlitePool) -> BkmResult<Self> {
        schema::create(&pool).await?;

        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Starts a write transaction, waiting for any other writer to finish.
    pub async fn begin(&self) -> BkmResult<StoreTxn<'_>> {
        let gate = self.write_gate.lock().await;
        let tx = self.pool.begin().await?;

        Ok(StoreTxn { tx, _gate: gate })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        debug!("closing bookmark database");
        self.pool.close().await;
    }
}

impl StoreTxn<'_> {
    pub async fn commit(self) -> BkmResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> BkmResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
