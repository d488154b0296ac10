//! Write transactions.
//!
//! SQLite upgrades a deferred transaction to a write lock on its first write;
//! if another writer got there first the upgrade fails with `SQLITE_BUSY`
//! without waiting on `busy_timeout`. Writers therefore open their
//! transaction with `BEGIN IMMEDIATE`, which takes the write lock up front and
//! queues behind other writers instead.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::error::{AppError, Result};

pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    /// Acquire a connection and take the database write lock
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("write transaction already closed".to_string()))
    }

    /// Commit on success, roll back on failure
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.end("COMMIT").await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.end("ROLLBACK").await {
                    tracing::error!("Rollback failed: {:?}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn end(mut self, statement: &'static str) -> Result<()> {
        sqlx::query(statement).execute(self.conn()?).await?;
        // Transaction closed: the connection can go back to the pool
        self.conn = None;
        Ok(())
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        // Dropped mid-transaction (error or cancelled request). The connection
        // still holds the write lock, so it is closed instead of being pooled;
        // closing rolls the transaction back.
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Write transaction dropped while open, discarding connection");
            drop(conn.detach());
        }
    }
}
