use chrono::{DateTime, Utc};
use docflow_util::id::{DocumentId, FolderId, TenantId};

/// A `(key, value)` metadata pair, both searchable and filterable.
#[derive(Debug, Clone)]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
}

/// Everything the index needs to know about a document version for upsert.
#[derive(Debug, Clone)]
pub struct UpsertDoc {
    pub document_id: DocumentId,
    pub tenant_id: TenantId,
    pub text_content: String,
    pub metadata: Vec<MetadataPair>,
    pub folder_id: Option<FolderId>,
    pub name: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// A reference to a document surfaced by `search`. Callers resolve the full
/// record through the metadata store; the index is a projection, not a source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    pub document_id: DocumentId,
    pub folder_id: Option<FolderId>,
    pub name: String,
}

/// Query shape for `search`. `content_query` is a free-text query string;
/// `metadata_filters` are exact `(key, value)` matches ANDed together.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub content_query: Option<String>,
    pub metadata_filters: Vec<MetadataPair>,
    pub folder_scope: Option<FolderId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_offset: Option<usize>,
}
