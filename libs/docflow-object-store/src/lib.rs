//! A generic object-store abstraction for the document pipeline: put, get, copy, delete and
//! presign bytes across the temporary/permanent/quarantine namespaces. Mirrors the "one trait,
//! a handful of swappable backends" shape used throughout this tree for remote storage: backends
//! implement [`ObjectStore`], callers mostly hold a [`GenericObjectStore`] and don't care which
//! backend is underneath.
#![deny(unsafe_code)]

mod archive;
mod error;
mod local;
mod s3;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use docflow_util::StorageKey;
use futures::Stream;

pub use error::StoreError;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

/// Allowed presign TTL range: `[60s, 24h]`.
pub const MIN_PRESIGN_TTL: Duration = Duration::from_secs(60);
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(24 * 3600);

/// Upper bound on an uploaded object's declared size, in bytes (100 MiB).
pub const MAX_OBJECT_SIZE_BYTES: u64 = 100 * 1024 * 1024;

pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;

/// One entry handed to [`ObjectStore::stream_archive`]: the object to pull plus the name it
/// should carry inside the produced archive.
pub struct ArchiveEntry {
    pub storage_key: String,
    pub archive_name: String,
}

/// A streamed object plus the metadata a caller needs to serve or validate it.
pub struct GetObject {
    pub stream: ByteStream,
    pub size: u64,
}

/// CRUD-like generic abstraction over object storage, namespace-agnostic: callers build
/// fully-qualified storage keys and this trait just moves bytes around.
#[allow(async_fn_in_trait)]
pub trait ObjectStore: Send + Sync + 'static {
    /// Streams `reader` into `key`, computing SHA-256 on the fly. If `expected_sha256` is given
    /// and disagrees with the computed digest, fails with [`StoreError::Integrity`] and the
    /// partially written object is removed before returning.
    async fn put_stream(
        &self,
        key: &StorageKey,
        reader: ByteStream,
        size: u64,
        content_type: &str,
        expected_sha256: Option<&str>,
    ) -> Result<String, StoreError>;

    async fn get_stream(&self, key: &str) -> Result<GetObject, StoreError>;

    /// Server-side copy, atomic from the caller's point of view.
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StoreError>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StoreError>;

    /// Streams a ZIP archive of `entries` to `writer`, aborting on the first sub-stream failure.
    async fn stream_archive(
        &self,
        entries: &[ArchiveEntry],
        writer: impl tokio::io::AsyncWrite + Unpin + Send,
    ) -> Result<(), StoreError>;
}

/// Every object store backend currently supported, dispatched without generics at call sites.
#[derive(Clone)]
pub enum GenericObjectStore {
    Local(Arc<LocalObjectStore>),
    S3(Arc<S3ObjectStore>),
}

impl GenericObjectStore {
    /// The storage-key grammar puts namespace first and tenant_id second. Reject a request
    /// whose derived tenant_id doesn't match the caller before making any network call.
    fn check_tenant(
        key: &StorageKey,
        expected_tenant: docflow_util::TenantId,
    ) -> Result<(), StoreError> {
        if key.tenant_id != expected_tenant {
            return Err(StoreError::Invalid(format!(
                "key tenant {} does not match caller tenant {expected_tenant}",
                key.tenant_id
            )));
        }
        Ok(())
    }

    pub async fn put_stream(
        &self,
        caller_tenant: docflow_util::TenantId,
        key: &StorageKey,
        reader: ByteStream,
        size: u64,
        content_type: &str,
        expected_sha256: Option<&str>,
    ) -> Result<String, StoreError> {
        Self::check_tenant(key, caller_tenant)?;
        if size > MAX_OBJECT_SIZE_BYTES {
            return Err(StoreError::Invalid(format!(
                "size {size} exceeds maximum of {MAX_OBJECT_SIZE_BYTES} bytes"
            )));
        }
        match self {
            Self::Local(s) => {
                s.put_stream(key, reader, size, content_type, expected_sha256)
                    .await
            }
            Self::S3(s) => {
                s.put_stream(key, reader, size, content_type, expected_sha256)
                    .await
            }
        }
    }

    pub async fn get_stream(&self, key: &str) -> Result<GetObject, StoreError> {
        match self {
            Self::Local(s) => s.get_stream(key).await,
            Self::S3(s) => s.get_stream(key).await,
        }
    }

    pub async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StoreError> {
        match self {
            Self::Local(s) => s.copy(src_key, dst_key).await,
            Self::S3(s) => s.copy(src_key, dst_key).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Local(s) => s.delete(key).await,
            Self::S3(s) => s.delete(key).await,
        }
    }

    pub async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        if ttl < MIN_PRESIGN_TTL || ttl > MAX_PRESIGN_TTL {
            return Err(StoreError::Invalid(format!(
                "ttl {ttl:?} outside allowed range [{MIN_PRESIGN_TTL:?}, {MAX_PRESIGN_TTL:?}]"
            )));
        }
        match self {
            Self::Local(s) => s.presign_get(key, ttl).await,
            Self::S3(s) => s.presign_get(key, ttl).await,
        }
    }

    pub async fn stream_archive(
        &self,
        entries: &[ArchiveEntry],
        writer: impl tokio::io::AsyncWrite + Unpin + Send,
    ) -> Result<(), StoreError> {
        archive::stream_archive(self, entries, writer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_util::{DocumentId, TenantId};

    #[test]
    fn rejects_mismatched_tenant_before_any_backend_call() {
        let owner = TenantId::generate();
        let attacker = TenantId::generate();
        let key = StorageKey::temporary(owner, DocumentId::generate(), 1);
        let err = GenericObjectStore::check_tenant(&key, attacker).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn accepts_matching_tenant() {
        let tenant = TenantId::generate();
        let key = StorageKey::temporary(tenant, DocumentId::generate(), 1);
        assert!(GenericObjectStore::check_tenant(&key, tenant).is_ok());
    }
}
