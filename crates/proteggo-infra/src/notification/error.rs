#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("No push registration token is stored")]
    MissingToken,

    #[error("Push messaging is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to read registration token: {0}")]
    TokenLookup(#[from] proteggo_db::DocumentError),

    #[error("Failed to encode notification payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Push delivery failed: {0}")]
    Delivery(String),
}
