//! Data models for the application
//!
//! Every persisted entity is an explicit typed structure; the document store only ever
//! sees its serde representation.

mod face;
mod image;
mod notification;
mod overlay;
mod post;
mod task;
pub mod timestamp;

pub use face::*;
pub use image::*;
pub use notification::*;
pub use overlay::*;
pub use post::*;
pub use task::*;
