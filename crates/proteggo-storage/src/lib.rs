//! Proteggo Storage Library
//!
//! Object store abstraction used by the upload handler and the processing pipeline.
//!
//! # Storage key format
//!
//! A single bucket namespace is partitioned by folder prefixes (`_temp/`, `faces/`,
//! `faces_overlays/`, `obscured_faces_overlays/`, `images/`). Keys must not contain `..`
//! or a leading `/`. Key generation is centralized in the `keys` module.
//!
//! Objects are shared through delivery URLs of the form
//! `https://<host>/v0/b/<bucket>/o/<escaped-key>?alt=media&token=<token>` where the token
//! is kept as object metadata and regenerated whenever a fresh link is needed.

pub mod delivery;
pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use delivery::{generate_download_token, DeliveryUrlBuilder, ObjectPublisher};
pub use factory::create_storage;
pub use keys::StorageKeys;
pub use local::LocalStorage;
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult};
