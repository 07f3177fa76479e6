//! The text-extractor contract (§6.4): consumed by the scan worker to turn a clean document's
//! bytes into `text_content` for the search index. Out of scope for this core — extraction
//! itself is expected to be a separate service or library wired in by the embedder — but the
//! seam and a minimal fallback implementation live here so the scan worker has something to
//! call without a hard dependency on any particular extraction stack.

use bytes::Bytes;
use docflow_object_store::ByteStream;
use futures::StreamExt;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no extractor registered for content type {0:?}")]
    UnsupportedType(String),

    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(async_fn_in_trait)]
pub trait TextExtractor: Send + Sync + 'static {
    async fn extract(&self, reader: ByteStream, content_type: &str) -> Result<String, ExtractError>;
}

/// Decodes UTF-8 text content types verbatim and declines everything else. The scan worker
/// treats [`ExtractError::UnsupportedType`] as "index metadata only", per §4.5/§6.4.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, mut reader: ByteStream, content_type: &str) -> Result<String, ExtractError> {
        if content_type != "text/plain" {
            return Err(ExtractError::UnsupportedType(content_type.to_string()));
        }
        let mut buf = Vec::new();
        while let Some(chunk) = reader.next().await {
            let chunk: Bytes = chunk?;
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
