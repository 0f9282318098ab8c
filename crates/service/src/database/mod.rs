//! SQLite engine for the content store

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use common::store::{ByteStore, ByteStoreError};

/// Ordered byte store over a single `records` table
#[derive(Debug, Clone)]
pub struct SqliteByteStore {
    pool: SqlitePool,
}

impl SqliteByteStore {
    /// Open (creating if needed) the database at `path`
    pub async fn open(path: &Path) -> Result<Self, DatabaseSetupError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(?path, "opened sqlite record store");
        Ok(store)
    }

    /// A private in-memory database, gone when the store is dropped
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        // every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseSetupError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn backend_error(e: sqlx::Error) -> ByteStoreError {
    match e {
        sqlx::Error::PoolClosed => ByteStoreError::Closed,
        e => ByteStoreError::Backend(e.into()),
    }
}

#[async_trait]
impl ByteStore for SqliteByteStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ByteStoreError> {
        let row = sqlx::query(
            r#"
            SELECT value FROM records WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), ByteStoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO records (key, value) VALUES (?, ?)
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ByteStoreError> {
        self.pool.close().await;
        Ok(())
    }

    async fn contains(&self, key: &[u8]) -> Result<bool, ByteStoreError> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM records WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;
        Ok(row.is_some())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),
    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("unable to create database directory: {0}")]
    Io(#[from] std::io::Error),
}
