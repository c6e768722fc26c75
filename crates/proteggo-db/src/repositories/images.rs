use std::sync::Arc;

use proteggo_core::constants::{fields, IMAGES_COLLECTION};
use proteggo_core::models::ImageRecord;
use serde_json::Value;

use super::{decode, encode, field};
use crate::error::DocumentResult;
use crate::query::{Direction, Filter, Query};
use crate::store::DocumentStore;

/// One page of images ordered by creation time.
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub images: Vec<ImageRecord>,
    /// Id of the last image on the page; empty when the page is empty.
    pub next_page_token: String,
}

#[derive(Clone)]
pub struct ImageRepository {
    store: Arc<dyn DocumentStore>,
}

impl ImageRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "get"))]
    pub async fn get(&self, id: &str) -> DocumentResult<Option<ImageRecord>> {
        match self.store.get(IMAGES_COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(IMAGES_COLLECTION, id, doc)?)),
            None => Ok(None),
        }
    }

    /// Write the full record, replacing any earlier version.
    #[tracing::instrument(skip(self, image), fields(db.collection = IMAGES_COLLECTION, db.operation = "set", image_id = %image.id))]
    pub async fn save(&self, image: &ImageRecord) -> DocumentResult<()> {
        let doc = encode(IMAGES_COLLECTION, &image.id, image)?;
        self.store.set(IMAGES_COLLECTION, &image.id, doc).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "merge"))]
    pub async fn set_post_id(&self, id: &str, post_id: &str) -> DocumentResult<()> {
        self.store
            .merge_update(
                IMAGES_COLLECTION,
                id,
                field(fields::POST_ID, Value::String(post_id.to_string())),
            )
            .await
    }

    #[tracing::instrument(skip(self, url), fields(db.collection = IMAGES_COLLECTION, db.operation = "merge"))]
    pub async fn set_obscured_overlay(
        &self,
        id: &str,
        url: &str,
        storage_path: &str,
    ) -> DocumentResult<()> {
        let mut doc = field(fields::FACES_OBSCURED_OVERLAY_URL, Value::String(url.to_string()));
        doc.insert(
            fields::FACES_OBSCURED_OVERLAY_STORAGE_PATH.to_string(),
            Value::String(storage_path.to_string()),
        );
        self.store.merge_update(IMAGES_COLLECTION, id, doc).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "merge"))]
    pub async fn clear_obscured_overlay(&self, id: &str) -> DocumentResult<()> {
        let mut doc = field(fields::FACES_OBSCURED_OVERLAY_URL, Value::Null);
        doc.insert(
            fields::FACES_OBSCURED_OVERLAY_STORAGE_PATH.to_string(),
            Value::Null,
        );
        self.store.merge_update(IMAGES_COLLECTION, id, doc).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "delete"))]
    pub async fn delete(&self, id: &str) -> DocumentResult<()> {
        self.store.delete(IMAGES_COLLECTION, id).await
    }

    /// Page through images by ascending creation time.
    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "query"))]
    pub async fn list_page(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> DocumentResult<ImagePage> {
        let mut query = Query::new()
            .order_by(fields::CREATED_AT, Direction::Asc)
            .limit(page_size);
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            query = query.start_after(token);
        }

        let images = self
            .store
            .query(IMAGES_COLLECTION, &query)
            .await?
            .into_iter()
            .map(|doc| decode::<ImageRecord>(IMAGES_COLLECTION, &doc.id, doc.fields))
            .collect::<DocumentResult<Vec<_>>>()?;

        let next_page_token = images.last().map(|i| i.id.clone()).unwrap_or_default();
        Ok(ImagePage {
            images,
            next_page_token,
        })
    }

    /// Images no post references yet.
    #[tracing::instrument(skip(self), fields(db.collection = IMAGES_COLLECTION, db.operation = "query"))]
    pub async fn list_unused(&self) -> DocumentResult<Vec<ImageRecord>> {
        let query = Query::new()
            .filter(Filter::is_null(fields::POST_ID))
            .order_by(fields::CREATED_AT, Direction::Asc);

        self.store
            .query(IMAGES_COLLECTION, &query)
            .await?
            .into_iter()
            .map(|doc| decode(IMAGES_COLLECTION, &doc.id, doc.fields))
            .collect()
    }
}
