//! The core-wide error taxonomy. Every orchestrator operation returns one of these; adapter
//! errors are folded in at the boundary so callers never match on adapter-specific types.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden")]
    AuthForbidden,

    #[error("forbidden: {0:?}")]
    AuthForbiddenMany(Vec<docflow_util::DocumentId>),

    #[error("not found")]
    NotFound,

    #[error("not found: {0:?}")]
    NotFoundMany(Vec<docflow_util::DocumentId>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(#[source] anyhow::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<docflow_object_store::StoreError> for CoreError {
    fn from(err: docflow_object_store::StoreError) -> Self {
        use docflow_object_store::StoreError::*;
        match err {
            NotFound(_) => CoreError::NotFound,
            Invalid(msg) => CoreError::Validation(msg),
            Quota => CoreError::QuotaExceeded,
            Io(e) => CoreError::Storage(e.into()),
            Integrity { .. } => CoreError::Storage(anyhow::anyhow!(err.to_string())),
            Backend(e) => CoreError::Storage(e),
        }
    }
}

impl From<docflow_metadata::MetadataError> for CoreError {
    fn from(err: docflow_metadata::MetadataError) -> Self {
        use docflow_metadata::MetadataError::*;
        match err {
            NotFound => CoreError::NotFound,
            Conflict { expected, actual } => {
                CoreError::Conflict(format!("expected status {expected}, found {actual}"))
            }
            Validation(msg) => CoreError::Validation(msg),
            Backend(e) => CoreError::DependencyUnavailable(e),
        }
    }
}

impl From<docflow_scan_queue::ScanQueueError> for CoreError {
    fn from(err: docflow_scan_queue::ScanQueueError) -> Self {
        use docflow_scan_queue::ScanQueueError::*;
        match err {
            NotFound => CoreError::NotFound,
            Backend(e) => CoreError::DependencyUnavailable(e),
        }
    }
}

impl From<docflow_scanner::ScanError> for CoreError {
    fn from(err: docflow_scanner::ScanError) -> Self {
        use docflow_scanner::ScanError::*;
        match err {
            Timeout => CoreError::Timeout,
            Connection(e) => CoreError::DependencyUnavailable(e),
            ProtocolMismatch(msg) => CoreError::DependencyUnavailable(anyhow::anyhow!(msg)),
        }
    }
}

impl From<docflow_search::SearchError> for CoreError {
    fn from(err: docflow_search::SearchError) -> Self {
        use docflow_search::SearchError::*;
        match err {
            MissingTenant => CoreError::Validation("tenant_id filter is required".to_string()),
            Backend(e) => CoreError::DependencyUnavailable(e),
        }
    }
}
