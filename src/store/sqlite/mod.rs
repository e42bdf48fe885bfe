mod repository;
mod schema;

use super::traits::{
    AppendOutcome, EvaluationRecord, HistoryEntry, ProfileBackend, ProfileVector, StoreFuture,
};
use crate::error::StoreError;
use anyhow::Context;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// SQLite-backed signature history.
///
/// Every version is one row of `signature_history`; the signature is kept
/// as JSON next to its label-space embedding (little-endian f32 BLOB).
pub struct SqliteBackend {
    pool: SqlitePool,
}

fn backend_error(err: &anyhow::Error) -> StoreError {
    StoreError::Backend(format!("{err:#}"))
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create store directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("open SQLite database {}", path.display()))?;

        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database. A single connection keeps every
    /// query on the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory SQLite")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }
}

impl ProfileBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load_history<'a>(&'a self, brand_id: &'a str) -> StoreFuture<'a, Vec<HistoryEntry>> {
        Box::pin(async move {
            repository::load_history(&self.pool, brand_id)
                .await
                .map_err(|err| backend_error(&err))
        })
    }

    fn append<'a>(
        &'a self,
        brand_id: &'a str,
        entry: &'a HistoryEntry,
    ) -> StoreFuture<'a, AppendOutcome> {
        Box::pin(async move {
            repository::append(&self.pool, brand_id, entry)
                .await
                .map_err(|err| backend_error(&err))
        })
    }

    fn scan_vectors(&self) -> StoreFuture<'_, Vec<ProfileVector>> {
        Box::pin(async move {
            repository::scan_vectors(&self.pool)
                .await
                .map_err(|err| backend_error(&err))
        })
    }

    fn insert_evaluation<'a>(&'a self, record: &'a EvaluationRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            repository::insert_evaluation(&self.pool, record)
                .await
                .map_err(|err| backend_error(&err))
        })
    }

    fn load_evaluation<'a>(
        &'a self,
        evaluation_id: &'a str,
    ) -> StoreFuture<'a, Option<EvaluationRecord>> {
        Box::pin(async move {
            repository::load_evaluation(&self.pool, evaluation_id)
                .await
                .map_err(|err| backend_error(&err))
        })
    }
}
