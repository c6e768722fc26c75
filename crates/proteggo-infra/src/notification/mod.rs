//! Client notification dispatch
//!
//! One registered push token receives a message per processed image.

mod dispatcher;
mod error;
mod push;

pub use dispatcher::NotificationDispatcher;
pub use error::NotificationError;
pub use push::{FcmPushSender, PushSender};
