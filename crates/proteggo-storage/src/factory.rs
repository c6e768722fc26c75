use crate::{LocalStorage, Storage, StorageResult};
use proteggo_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.local_storage_path()).await?;
    tracing::info!(
        backend = storage.backend_name(),
        path = %storage.base_path().display(),
        "Object storage initialized"
    );
    Ok(Arc::new(storage))
}
