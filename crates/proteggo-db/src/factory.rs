use std::sync::Arc;

use proteggo_core::{Config, DocumentStoreBackend};

use crate::memory::MemoryDocumentStore;
use crate::postgres::{setup_pool, PgDocumentStore};
use crate::store::DocumentStore;

/// Create the configured document store backend.
pub async fn create_document_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.document_store() {
        DocumentStoreBackend::Postgres => {
            let url = config
                .database_url()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not configured"))?;
            let pool = setup_pool(url, config.db_max_connections()).await?;
            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
        DocumentStoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}
