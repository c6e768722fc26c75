use std::sync::Arc;

use proteggo_core::constants::POSTS_COLLECTION;
use proteggo_core::models::PostRecord;

use super::{decode, encode};
use crate::error::DocumentResult;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn DocumentStore>,
}

impl PostRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(db.collection = POSTS_COLLECTION, db.operation = "get"))]
    pub async fn get(&self, id: &str) -> DocumentResult<Option<PostRecord>> {
        match self.store.get(POSTS_COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(POSTS_COLLECTION, id, doc)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, post), fields(db.collection = POSTS_COLLECTION, db.operation = "set", post_id = %post.id))]
    pub async fn save(&self, post: &PostRecord) -> DocumentResult<()> {
        let doc = encode(POSTS_COLLECTION, &post.id, post)?;
        self.store.set(POSTS_COLLECTION, &post.id, doc).await
    }
}
