#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("sink request failed: {0}")]
    Request(#[source] anyhow::Error),

    #[error("sink rejected the event with status {0}")]
    Rejected(u16),
}
