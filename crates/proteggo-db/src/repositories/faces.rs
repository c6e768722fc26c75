use std::sync::Arc;

use proteggo_core::constants::{fields, FACES_COLLECTION};
use proteggo_core::models::FaceRecord;
use serde_json::Value;

use super::{decode, encode, field};
use crate::error::DocumentResult;
use crate::query::{Direction, Filter, Query};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct FaceRepository {
    store: Arc<dyn DocumentStore>,
}

impl FaceRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(db.collection = FACES_COLLECTION, db.operation = "get"))]
    pub async fn get(&self, id: &str) -> DocumentResult<Option<FaceRecord>> {
        match self.store.get(FACES_COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(FACES_COLLECTION, id, doc)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, face), fields(db.collection = FACES_COLLECTION, db.operation = "set", face_id = %face.id))]
    pub async fn save(&self, face: &FaceRecord) -> DocumentResult<()> {
        let doc = encode(FACES_COLLECTION, &face.id, face)?;
        self.store.set(FACES_COLLECTION, &face.id, doc).await
    }

    #[tracing::instrument(skip(self), fields(db.collection = FACES_COLLECTION, db.operation = "merge"))]
    pub async fn set_post_id(&self, id: &str, post_id: &str) -> DocumentResult<()> {
        self.store
            .merge_update(
                FACES_COLLECTION,
                id,
                field(fields::POST_ID, Value::String(post_id.to_string())),
            )
            .await
    }

    #[tracing::instrument(skip(self), fields(db.collection = FACES_COLLECTION, db.operation = "delete"))]
    pub async fn delete(&self, id: &str) -> DocumentResult<()> {
        self.store.delete(FACES_COLLECTION, id).await
    }

    /// All faces detected on one image, in detection order.
    #[tracing::instrument(skip(self), fields(db.collection = FACES_COLLECTION, db.operation = "query"))]
    pub async fn list_by_image(&self, image_id: &str) -> DocumentResult<Vec<FaceRecord>> {
        let query = Query::new()
            .filter(Filter::eq(fields::IMAGE_ID, Value::String(image_id.to_string())))
            .order_by(fields::CREATED_AT, Direction::Asc);

        self.store
            .query(FACES_COLLECTION, &query)
            .await?
            .into_iter()
            .map(|doc| decode(FACES_COLLECTION, &doc.id, doc.fields))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use chrono::Utc;
    use proteggo_core::models::{face_id, Vertex};

    fn face(image_id: &str, index: usize) -> FaceRecord {
        FaceRecord {
            id: face_id(image_id, index),
            image_id: image_id.to_string(),
            post_id: None,
            vertices: vec![
                Vertex::new(0, 0),
                Vertex::new(10, 0),
                Vertex::new(10, 10),
                Vertex::new(0, 10),
            ],
            landmarks: vec![],
            roll_angle: 0.0,
            pan_angle: 0.0,
            tilt_angle: 0.0,
            emotion: "Joy".to_string(),
            url: format!("https://storage.test/{}_{}", image_id, index),
            storage_path: format!("faces/{}_{}.jpg", image_id, index),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_by_image_filters_other_images() {
        let repo = FaceRepository::new(Arc::new(MemoryDocumentStore::new()));
        repo.save(&face("img-1", 0)).await.unwrap();
        repo.save(&face("img-1", 1)).await.unwrap();
        repo.save(&face("img-2", 0)).await.unwrap();

        let faces = repo.list_by_image("img-1").await.unwrap();
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|f| f.image_id == "img-1"));
    }

    #[tokio::test]
    async fn test_save_is_idempotent_per_face_id() {
        let repo = FaceRepository::new(Arc::new(MemoryDocumentStore::new()));
        let record = face("img-1", 0);
        repo.save(&record).await.unwrap();
        repo.save(&record).await.unwrap();

        assert_eq!(repo.list_by_image("img-1").await.unwrap().len(), 1);

        repo.set_post_id(&record.id, "post-1").await.unwrap();
        let stored = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.post_id.as_deref(), Some("post-1"));

        repo.delete(&record.id).await.unwrap();
        assert!(repo.get(&record.id).await.unwrap().is_none());
    }
}
