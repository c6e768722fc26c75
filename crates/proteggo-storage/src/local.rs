use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the storage root holding one JSON metadata file per object.
const METADATA_DIR: &str = ".metadata";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory or address the
    /// metadata tree.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        if key == METADATA_DIR || key.starts_with(&format!("{}/", METADATA_DIR)) {
            return Err(StorageError::InvalidKey(
                "Storage key addresses reserved metadata directory".to_string(),
            ));
        }

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(METADATA_DIR)
            .join(format!("{}.json", key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.ensure_parent_dir(path).await?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn write_metadata(&self, key: &str, metadata: &ObjectMetadata) -> StorageResult<()> {
        let encoded = serde_json::to_vec(metadata)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode metadata: {}", e)))?;
        self.write_file(&self.metadata_path(key), &encoded).await
    }

    async fn read_metadata(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        let path = self.metadata_path(key);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let raw = fs::read(&path).await?;
        let metadata = serde_json::from_slice(&raw).map_err(|e| {
            StorageError::BackendError(format!(
                "Corrupt metadata for {}: {}",
                key, e
            ))
        })?;
        Ok(Some(metadata))
    }

    /// Recursively collect object keys below `dir`, skipping the metadata tree.
    async fn collect_keys(&self, dir: PathBuf, keys: &mut Vec<String>) -> StorageResult<()> {
        let mut pending = vec![dir];

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if current == self.base_path && entry.file_name() == METADATA_DIR {
                        continue;
                    }
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Ok(relative) = path.strip_prefix(&self.base_path) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect::<Vec<_>>()
                            .join("/");
                        keys.push(key);
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();
        let start = std::time::Instant::now();

        self.write_file(&path, &data).await?;
        self.write_metadata(
            key,
            &ObjectMetadata {
                content_type: content_type.to_string(),
                size_bytes: size as u64,
                download_token: None,
            },
        )
        .await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        let metadata_path = self.metadata_path(key);
        if fs::try_exists(&metadata_path).await.unwrap_or(false) {
            fs::remove_file(&metadata_path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete metadata {}: {}",
                    metadata_path.display(),
                    e
                ))
            })?;
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from_path = self.key_to_path(from_key)?;
        let to_path = self.key_to_path(to_key)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        let metadata = match self.read_metadata(from_key).await? {
            Some(metadata) => metadata,
            None => ObjectMetadata {
                content_type: "application/octet-stream".to_string(),
                size_bytes: fs::metadata(&to_path).await?.len(),
                download_token: None,
            },
        };
        self.write_metadata(to_key, &metadata).await?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        if prefix.contains("..") || prefix.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage prefix contains invalid characters".to_string(),
            ));
        }

        // Only walk the deepest directory the prefix names.
        let dir = match prefix.rfind('/') {
            Some(idx) => self.base_path.join(&prefix[..idx]),
            None => self.base_path.clone(),
        };

        let mut keys = Vec::new();
        self.collect_keys(dir, &mut keys).await?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let path = self.key_to_path(key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        match self.read_metadata(key).await? {
            Some(metadata) => Ok(metadata),
            None => Ok(ObjectMetadata {
                content_type: "application/octet-stream".to_string(),
                size_bytes: fs::metadata(&path).await?.len(),
                download_token: None,
            }),
        }
    }

    async fn set_download_token(&self, key: &str, token: &str) -> StorageResult<()> {
        let mut metadata = self.metadata(key).await?;
        metadata.download_token = Some(token.to_string());
        self.write_metadata(key, &metadata).await
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"raw jpeg bytes".to_vec();
        storage
            .put("_temp/upload.jpg", data.clone(), "image/jpeg")
            .await
            .unwrap();

        let downloaded = storage.get("_temp/upload.jpg").await.unwrap();
        assert_eq!(data, downloaded);

        let metadata = storage.metadata("_temp/upload.jpg").await.unwrap();
        assert_eq!(metadata.content_type, "image/jpeg");
        assert_eq!(metadata.size_bytes, data.len() as u64);
        assert!(metadata.download_token.is_none());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.get(".metadata/x.json").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("images/missing.webp").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.delete("nonexistent/file.txt").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_move_object_keeps_metadata() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("_temp/img-1.png", b"png".to_vec(), "image/png")
            .await
            .unwrap();
        storage
            .set_download_token("_temp/img-1.png", "tok")
            .await
            .unwrap();

        storage
            .move_object("_temp/img-1.png", "obscured_faces_overlays/img-1.png")
            .await
            .unwrap();

        assert!(!storage.exists("_temp/img-1.png").await.unwrap());
        assert!(storage
            .exists("obscured_faces_overlays/img-1.png")
            .await
            .unwrap());
        assert_eq!(
            storage
                .download_token("obscured_faces_overlays/img-1.png")
                .await
                .unwrap(),
            Some("tok".to_string())
        );
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.move_object("_temp/none.png", "faces/none.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_prefix_skips_metadata() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        for key in ["_temp/b.jpg", "_temp/a.png", "images/c.webp"] {
            storage.put(key, b"x".to_vec(), "image/png").await.unwrap();
        }

        let temp = storage.list("_temp/").await.unwrap();
        assert_eq!(temp, vec!["_temp/a.png".to_string(), "_temp/b.jpg".to_string()]);

        let all = storage.list("").await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|k| !k.starts_with(".metadata")));

        assert!(storage.list("faces/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_resets_download_token() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("faces_overlays/img.png", b"v1".to_vec(), "image/png")
            .await
            .unwrap();
        storage
            .set_download_token("faces_overlays/img.png", "old")
            .await
            .unwrap();
        storage
            .put("faces_overlays/img.png", b"v2".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(
            storage
                .download_token("faces_overlays/img.png")
                .await
                .unwrap(),
            None
        );
    }
}
