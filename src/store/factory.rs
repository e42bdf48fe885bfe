use super::memory::InMemoryBackend;
use super::sqlite::SqliteBackend;
use super::traits::ProfileBackend;
use crate::config::{StoreBackendKind, StoreConfig};
use std::sync::Arc;

/// Build the configured profile backend.
pub async fn create_backend(config: &StoreConfig) -> anyhow::Result<Arc<dyn ProfileBackend>> {
    match config.backend {
        StoreBackendKind::Memory => {
            tracing::info!("Using in-memory signature store");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        StoreBackendKind::Sqlite => {
            let path = config.resolved_path();
            tracing::info!(path = %path.display(), "Using SQLite signature store");
            Ok(Arc::new(SqliteBackend::open(&path).await?))
        }
    }
}
