use std::sync::Arc;

use proteggo_core::constants::{MESSAGING_TOKEN_COLLECTION, MESSAGING_TOKEN_DOCUMENT};
use proteggo_core::models::MessagingToken;

use super::{decode, encode};
use crate::error::DocumentResult;
use crate::store::DocumentStore;

/// The single device registration token notifications are pushed to.
#[derive(Clone)]
pub struct MessagingTokenRepository {
    store: Arc<dyn DocumentStore>,
}

impl MessagingTokenRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(db.collection = MESSAGING_TOKEN_COLLECTION, db.operation = "get"))]
    pub async fn get(&self) -> DocumentResult<Option<MessagingToken>> {
        match self
            .store
            .get(MESSAGING_TOKEN_COLLECTION, MESSAGING_TOKEN_DOCUMENT)
            .await?
        {
            Some(doc) => Ok(Some(decode(
                MESSAGING_TOKEN_COLLECTION,
                MESSAGING_TOKEN_DOCUMENT,
                doc,
            )?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, token), fields(db.collection = MESSAGING_TOKEN_COLLECTION, db.operation = "set"))]
    pub async fn set(&self, token: &MessagingToken) -> DocumentResult<()> {
        let doc = encode(MESSAGING_TOKEN_COLLECTION, MESSAGING_TOKEN_DOCUMENT, token)?;
        self.store
            .set(MESSAGING_TOKEN_COLLECTION, MESSAGING_TOKEN_DOCUMENT, doc)
            .await
    }
}
