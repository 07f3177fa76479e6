//! Search index adapter (C5): a tenant-filtered projection of document content and metadata,
//! rebuildable from the metadata store and object store and never a source of truth on its own.

mod error;
mod index;
mod model;
mod schema;

pub use error::{SearchError, SearchResult};
pub use index::SearchIndex;
pub use model::{DocRef, MetadataPair, Page, Pagination, SearchQuery, UpsertDoc};
