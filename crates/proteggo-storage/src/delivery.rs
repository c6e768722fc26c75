//! Delivery URLs and token-authenticated publishing.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::traits::{Storage, StorageError, StorageResult};

/// Characters left unescaped in an object path segment. `/` is escaped so the whole key
/// is a single URL segment.
const OBJECT_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Mint a fresh random download token.
pub fn generate_download_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Builds `https://<host>/v0/b/<bucket>/o/<escaped-key>?alt=media&token=<token>` URLs.
#[derive(Debug, Clone)]
pub struct DeliveryUrlBuilder {
    base_url: String,
    bucket: String,
}

impl DeliveryUrlBuilder {
    /// `host` may carry an explicit scheme (useful for local development); `https` is
    /// assumed otherwise.
    pub fn new(host: &str, bucket: impl Into<String>) -> Self {
        let host = host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        Self {
            base_url,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn url(&self, key: &str, token: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}?alt=media&token={}",
            self.base_url,
            self.bucket,
            utf8_percent_encode(key, OBJECT_PATH),
            token
        )
    }
}

/// Writes objects and hands out delivery URLs for them.
#[derive(Clone)]
pub struct ObjectPublisher {
    storage: Arc<dyn Storage>,
    urls: DeliveryUrlBuilder,
}

impl ObjectPublisher {
    pub fn new(storage: Arc<dyn Storage>, urls: DeliveryUrlBuilder) -> Self {
        Self { storage, urls }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn urls(&self) -> &DeliveryUrlBuilder {
        &self.urls
    }

    /// Put `data` at `key`, mint a fresh token and return the delivery URL.
    #[tracing::instrument(skip(self, data), fields(storage.key = %key, size_bytes = data.len()))]
    pub async fn publish(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        self.storage.put(key, data, content_type).await?;
        self.refresh_url(key).await
    }

    /// Mint a fresh token for an existing object and return its new delivery URL.
    pub async fn refresh_url(&self, key: &str) -> StorageResult<String> {
        let token = generate_download_token();
        self.storage.set_download_token(key, &token).await?;
        Ok(self.urls.url(key, &token))
    }

    /// Check a presented token against the one stored with the object.
    pub async fn verify_token(&self, key: &str, token: &str) -> StorageResult<bool> {
        match self.storage.download_token(key).await {
            Ok(Some(expected)) => Ok(!token.is_empty() && expected == token),
            Ok(None) => Ok(false),
            Err(StorageError::NotFound(_)) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e),
        }
    }
}
