//! Error taxonomy for the metadata store. Callers upstream fold these into the core-wide
//! taxonomy; this crate only distinguishes what it can itself detect.

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("not found")]
    NotFound,

    #[error("conflict: expected status {expected:?}, found {actual:?}")]
    Conflict {
        expected: String,
        actual: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

impl MetadataError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, MetadataError::Backend(_))
    }
}
