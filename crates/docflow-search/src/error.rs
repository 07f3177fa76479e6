#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("tenant_id filter is required and must not be empty")]
    MissingTenant,

    #[error("index error: {0}")]
    Backend(#[source] anyhow::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;
