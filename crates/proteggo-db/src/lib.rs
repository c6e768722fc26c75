//! Document store layer
//!
//! `DocumentStore` is a minimal collection/id/fields API with upsert-merge writes and
//! filtered, ordered, paginated queries. Two backends implement it: Postgres (one JSONB
//! row per document) and an in-memory map used in development and tests.
//!
//! Typed repositories on top of it turn raw fields into domain models; a document that
//! does not decode is reported as `DocumentError::Data`, never defaulted.

pub mod error;
pub mod factory;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repositories;
pub mod store;

pub use error::{DocumentError, DocumentResult};
pub use factory::create_document_store;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use query::{Direction, Document, Fields, Filter, OrderBy, Query};
pub use repositories::{
    FaceRepository, ImagePage, ImageRepository, MessagingTokenRepository, PostRepository,
};
pub use store::DocumentStore;
