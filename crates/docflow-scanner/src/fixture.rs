//! A deterministic scanner double for tests: verdicts are keyed by the SHA-256 of the scanned
//! bytes, so a test's scan outcome is a pure function of its input, exactly as §4.4 requires.

use std::collections::HashMap;

use futures::StreamExt;
use sha2::{Digest, Sha256};

use crate::error::ScanError;
use crate::{ByteStream, ScannerClient, Verdict};

#[derive(Default)]
pub struct FixtureScannerClient {
    signatures: HashMap<String, Verdict>,
}

impl FixtureScannerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the verdict to return whenever the scanned bytes hash to `sha256_hex`.
    pub fn with_signature(mut self, sha256_hex: impl Into<String>, verdict: Verdict) -> Self {
        self.signatures.insert(sha256_hex.into(), verdict);
        self
    }
}

impl ScannerClient for FixtureScannerClient {
    async fn scan(&self, mut reader: ByteStream, _size_hint: u64) -> Result<Verdict, ScanError> {
        let mut hasher = Sha256::new();
        while let Some(chunk) = reader.next().await {
            let chunk = chunk.map_err(|e| ScanError::Connection(e.into()))?;
            hasher.update(&chunk);
        }
        let digest = hex::encode(hasher.finalize());
        Ok(self
            .signatures
            .get(&digest)
            .cloned()
            .unwrap_or(Verdict::Clean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn stream_of(data: &'static [u8]) -> ByteStream {
        Box::pin(futures::stream::once(async move { Ok(Bytes::from(data)) }))
    }

    #[tokio::test]
    async fn unregistered_content_scans_clean() {
        let client = FixtureScannerClient::new();
        let verdict = client.scan(stream_of(b"hello"), 5).await.unwrap();
        assert_eq!(verdict, Verdict::Clean);
    }

    #[tokio::test]
    async fn registered_signature_is_returned() {
        let digest = {
            let mut hasher = Sha256::new();
            hasher.update(b"eicar");
            hex::encode(hasher.finalize())
        };
        let client = FixtureScannerClient::new()
            .with_signature(digest, Verdict::Infected("Eicar-Test".to_string()));
        let verdict = client.scan(stream_of(b"eicar"), 5).await.unwrap();
        assert_eq!(verdict, Verdict::Infected("Eicar-Test".to_string()));
    }
}
