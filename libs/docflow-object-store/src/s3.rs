//! S3-backed object store. Every object is written with `ServerSideEncryption::Aes256`
//! unconditionally: tenant isolation at the storage layer is defense in depth, not something a
//! caller can opt out of per request.

use std::time::Duration;

use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use docflow_util::StorageKey;
use futures::StreamExt;
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::{ByteStream, GetObject, ObjectStore};

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the ambient AWS config, pinned to `region`. Credentials follow the
    /// default provider chain (environment, profile, IMDS), matching how this tree's other S3
    /// clients are constructed.
    pub async fn from_env(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let config = aws_config::from_env()
            .region(Region::new(region.into()))
            .load()
            .await;
        Self::new(Client::new(&config), bucket)
    }
}

impl ObjectStore for S3ObjectStore {
    async fn put_stream(
        &self,
        key: &StorageKey,
        mut reader: ByteStream,
        size: u64,
        content_type: &str,
        expected_sha256: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut buf = Vec::with_capacity(size as usize);
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
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&storage_key)
            .content_type(content_type)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(S3ByteStream::from(buf))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(storage_key)
    }

    async fn get_stream(&self, key: &str) -> Result<GetObject, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_get_error(key, e))?;
        let size = output.content_length().unwrap_or(0).max(0) as u64;
        let stream: ByteStream = Box::pin(
            output
                .body
                .into_async_read()
                .compat_into_stream(),
        );
        Ok(GetObject { stream, size })
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StoreError> {
        let source = format!("{}/{src_key}", self.bucket);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(dst_key)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StoreError> {
        let config = PresigningConfig::expires_in(ttl).map_err(|e| StoreError::Backend(e.into()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(presigned.uri().to_string())
    }

    async fn stream_archive(
        &self,
        entries: &[crate::ArchiveEntry],
        writer: impl tokio::io::AsyncWrite + Unpin + Send,
    ) -> Result<(), StoreError> {
        crate::archive::write_zip(self, entries, writer).await
    }
}

fn classify_get_error(key: &str, err: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>) -> StoreError {
    use aws_sdk_s3::operation::get_object::GetObjectError;
    match err.as_service_error() {
        Some(GetObjectError::NoSuchKey(_)) => StoreError::NotFound(key.to_string()),
        _ => StoreError::Backend(err.into()),
    }
}

trait CompatIntoStream {
    fn compat_into_stream(self) -> crate::ByteStream;
}

impl<R> CompatIntoStream for R
where
    R: tokio::io::AsyncRead + Send + 'static,
{
    fn compat_into_stream(self) -> crate::ByteStream {
        Box::pin(tokio_util::io::ReaderStream::new(self))
    }
}
