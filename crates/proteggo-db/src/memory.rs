use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{DocumentError, DocumentResult};
use crate::query::{Document, Fields, Query};
use crate::store::DocumentStore;

/// In-process document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Fields>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn merge_update(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (key, value) in fields {
            existing.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> DocumentResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return match &query.start_after {
                Some(token) => Err(DocumentError::NotFound(format!("{}/{}", collection, token))),
                None => Ok(Vec::new()),
            };
        };

        let cursor = match &query.start_after {
            Some(token) => {
                let fields = docs
                    .get(token)
                    .ok_or_else(|| DocumentError::NotFound(format!("{}/{}", collection, token)))?;
                Some(Document {
                    id: token.clone(),
                    fields: fields.clone(),
                })
            }
            None => None,
        };

        let mut results: Vec<Document> = docs
            .iter()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .filter(|doc| match &cursor {
                Some(cursor) => query.compare(doc, cursor).is_gt(),
                None => true,
            })
            .collect();

        results.sort_by(|a, b| query.compare(a, b));
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
