//! An in-memory backend used by tests and by any binary that wants object storage without a
//! real bucket. Playing the same role `LocalFs` plays for remote storage: a drop-in backend
//! for tests that implements the full contract rather than stubbing pieces of it out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use docflow_util::StorageKey;
use futures::StreamExt;
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::{ByteStream, GetObject, ObjectStore};

struct Entry {
    bytes: Bytes,
    content_type: String,
}

/// Object store backed by a process-local map. Presigned URLs are synthetic
/// (`mem://<key>?exp=<unix_ts>`) and not independently verifiable; fine for tests, useless in
/// production, which is the whole point of keeping it separate from [`crate::S3ObjectStore`].
#[derive(Default)]
pub struct LocalObjectStore {
    objects: Mutex<HashMap<String, Entry>>,
}

impl LocalObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for LocalObjectStore {
    async fn put_stream(
        &self,
        key: &StorageKey,
        mut reader: ByteStream,
        size: u64,
        content_type: &str,
        expected_sha256: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut buf = BytesMut::with_capacity(size as usize);
        let mut hasher = Sha256::new();
        while let Some(chunk) = reader.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            buf.extend_from_slice(&chunk);
        }
        let digest = hex::encode(hasher.finalize());
        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&digest) {
                return Err(StoreError::Integrity {
                    expected: expected.to_string(),
                    computed: digest,
                });
            }
        }
        let storage_key = key.to_string();
        self.objects.lock().unwrap().insert(
            storage_key.clone(),
            Entry {
                bytes: buf.freeze(),
                content_type: content_type.to_string(),
            },
        );
        Ok(storage_key)
    }

    async fn get_stream(&self, key: &str) -> Result<GetObject, StoreError> {
        let bytes = {
            let objects = self.objects.lock().unwrap();
            let entry = objects
                .get(key)
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
            entry.bytes.clone()
        };
        let size = bytes.len() as u64;
        let stream: ByteStream = Box::pin(futures::stream::once(async move { Ok(bytes) }));
        Ok(GetObject { stream, size })
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap();
        let src = objects
            .get(src_key)
            .ok_or_else(|| StoreError::NotFound(src_key.to_string()))?;
        let copied = Entry {
            bytes: src.bytes.clone(),
            content_type: src.content_type.clone(),
        };
        objects.insert(dst_key.to_string(), copied);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        if !self.objects.lock().unwrap().contains_key(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(format!("mem://{key}?exp={}", ttl.as_secs()))
    }

    async fn stream_archive(
        &self,
        entries: &[crate::ArchiveEntry],
        writer: impl tokio::io::AsyncWrite + Unpin + Send,
    ) -> Result<(), StoreError> {
        crate::archive::write_zip(self, entries, writer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_util::{DocumentId, TenantId};

    fn stream_of(data: &'static [u8]) -> ByteStream {
        Box::pin(futures::stream::once(async move { Ok(Bytes::from(data)) }))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = LocalObjectStore::new();
        let key = StorageKey::temporary(TenantId::generate(), DocumentId::generate(), 1);
        store
            .put_stream(&key, stream_of(b"hello"), 5, "text/plain", None)
            .await
            .unwrap();
        let got = store.get_stream(&key.to_string()).await.unwrap();
        assert_eq!(got.size, 5);
    }

    #[tokio::test]
    async fn mismatched_digest_is_rejected() {
        let store = LocalObjectStore::new();
        let key = StorageKey::temporary(TenantId::generate(), DocumentId::generate(), 1);
        let err = store
            .put_stream(&key, stream_of(b"hello"), 5, "text/plain", Some("deadbeef"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = LocalObjectStore::new();
        store.delete("temp/does/not/exist/1").await.unwrap();
        store.delete("temp/does/not/exist/1").await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let store = LocalObjectStore::new();
        let err = store.get_stream("temp/missing/1/1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
