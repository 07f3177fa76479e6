//! Error taxonomy for the object store adapter (§4.1).

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("integrity check failed: expected {expected}, computed {computed}")]
    Integrity { expected: String, computed: String },

    #[error("storage quota exceeded")]
    Quota,

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("upstream object store error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Backend(_))
    }
}
