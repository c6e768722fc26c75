use proteggo_core::models::NotificationPayload;
use proteggo_db::MessagingTokenRepository;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::NotificationError;
use super::push::PushSender;

/// Looks up the single registered token and pushes the payload to it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tokens: MessagingTokenRepository,
    sender: Arc<dyn PushSender>,
}

impl NotificationDispatcher {
    pub fn new(tokens: MessagingTokenRepository, sender: Arc<dyn PushSender>) -> Self {
        Self { tokens, sender }
    }

    /// A missing or empty token is an error, never a silent no-op.
    #[tracing::instrument(skip(self, payload), fields(image_id = %payload.image_id))]
    pub async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        let token = match self.tokens.get().await? {
            Some(stored) if !stored.token.is_empty() => stored.token,
            _ => {
                tracing::error!("Registration token is empty or missing");
                return Err(NotificationError::MissingToken);
            }
        };

        let mut data = HashMap::new();
        data.insert("data".to_string(), serde_json::to_string(payload)?);

        self.sender.send(&token, data).await.map_err(|e| {
            tracing::error!(error = %e, "Error sending message to client");
            e
        })?;

        tracing::info!(
            face_count = payload.faces_ids.len(),
            "Notification delivered"
        );
        Ok(())
    }
}
