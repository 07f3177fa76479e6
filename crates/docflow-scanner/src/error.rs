#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scanner timed out")]
    Timeout,

    #[error("connection to scanner failed: {0}")]
    Connection(#[source] anyhow::Error),

    #[error("scanner protocol mismatch: {0}")]
    ProtocolMismatch(String),
}

impl ScanError {
    /// §4.7 retryability table: every scanner error is retryable, since it reflects an
    /// infrastructure hiccup rather than anything about the scanned bytes.
    pub fn is_retryable(&self) -> bool {
        true
    }
}
