//! A byte-counting, SHA-256-hashing wrapper around a [`ByteStream`], so the upload orchestrator
//! can compute `content_hash` while the bytes pass through to the object store rather than
//! buffering them a second time.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use docflow_object_store::ByteStream;
use futures::Stream;
use sha2::{Digest, Sha256};

pub struct HashingStream {
    inner: ByteStream,
    hasher: Arc<Mutex<Sha256>>,
}

impl HashingStream {
    /// Wraps `inner`, returning the wrapped stream plus a handle that yields the hex-encoded
    /// digest once the stream has been fully drained.
    pub fn wrap(inner: ByteStream) -> (ByteStream, DigestHandle) {
        let hasher = Arc::new(Mutex::new(Sha256::new()));
        let handle = DigestHandle {
            hasher: hasher.clone(),
        };
        let stream = HashingStream { inner, hasher };
        (Box::pin(stream), handle)
    }
}

impl Stream for HashingStream {
    type Item = std::io::Result<bytes::Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.hasher.lock().unwrap().update(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

#[derive(Clone)]
pub struct DigestHandle {
    hasher: Arc<Mutex<Sha256>>,
}

impl DigestHandle {
    /// Only meaningful after the wrapped stream has been fully consumed.
    pub fn finalize_hex(&self) -> String {
        hex::encode(self.hasher.lock().unwrap().clone().finalize())
    }
}
