use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A stored document does not have the expected shape.
    #[error("Malformed document {collection}/{id}: {message}")]
    Data {
        collection: String,
        id: String,
        message: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Document store backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DocumentError {
    pub fn data(collection: &str, id: &str, message: impl Into<String>) -> Self {
        DocumentError::Data {
            collection: collection.to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DocumentError::Backend(_) => true,
            DocumentError::Database(err) => !matches!(
                err,
                sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)
            ),
            _ => false,
        }
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;
