//! Typed repositories over the document store.

mod faces;
mod images;
mod messaging;
mod posts;

pub use faces::FaceRepository;
pub use images::{ImagePage, ImageRepository};
pub use messaging::MessagingTokenRepository;
pub use posts::PostRepository;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DocumentError, DocumentResult};
use crate::query::Fields;

/// Serialise a model into document fields.
pub(crate) fn encode<T: Serialize>(collection: &str, id: &str, value: &T) -> DocumentResult<Fields> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(DocumentError::data(collection, id, "model did not serialise to an object")),
        Err(e) => Err(DocumentError::data(collection, id, e.to_string())),
    }
}

/// Decode document fields into a model; any mismatch is a data error.
pub(crate) fn decode<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    fields: Fields,
) -> DocumentResult<T> {
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| DocumentError::data(collection, id, e.to_string()))
}

/// Single-field merge payload.
pub(crate) fn field(name: &str, value: serde_json::Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(name.to_string(), value);
    fields
}
