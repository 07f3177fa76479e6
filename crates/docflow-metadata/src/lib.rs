//! Transactional, tenant-scoped storage for documents, versions, metadata, permissions and
//! events. Every query predicate here is expected to include `tenant_id`: a row belonging to a
//! different tenant must come back as [`MetadataError::NotFound`], never a forbidden or conflict
//! variant, so that existence never leaks across tenants.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
mod store;

pub use error::{MetadataError, MetadataResult};
pub use memory::InMemoryMetadataStore;
pub use models::*;
pub use postgres::PgMetadataStore;
pub use store::MetadataStore;
