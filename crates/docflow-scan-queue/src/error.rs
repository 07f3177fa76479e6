#[derive(Debug, thiserror::Error)]
pub enum ScanQueueError {
    #[error("scan task not found or already acked")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

pub type ScanQueueResult<T> = Result<T, ScanQueueError>;
