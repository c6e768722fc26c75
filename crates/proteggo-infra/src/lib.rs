//! Proteggo Infrastructure Library
//!
//! Shared infrastructure used by the HTTP service:
//! - Tracing initialisation
//! - Request ID middleware
//! - Client notification dispatch over push messaging

pub mod middleware;
pub mod notification;
pub mod telemetry;

// Re-export commonly used types
pub use middleware::{get_request_id, request_id_middleware, RequestId};
pub use notification::{
    FcmPushSender, NotificationDispatcher, NotificationError, PushSender,
};
pub use telemetry::{init_telemetry, shutdown_telemetry};
