//! Upload orchestrator: validate, stage, persist, then enqueue, in that order, with a
//! compensating transaction if the enqueue step fails after metadata has already landed.

use std::sync::Arc;

use docflow_metadata::{
    DocumentStatus, DocumentVersion, MetadataStore, NewDocument, NewVersion, PermissionType, ResourceType,
};
use docflow_object_store::{ByteStream, GenericObjectStore};
use docflow_scan_queue::{NewScanTask, ScanQueue};
use docflow_util::{DocumentId, FolderId, VersionId};

use docflow_events::{EventEnvelope, EventPublisher, EventType};

use crate::config::DocflowConfig;
use crate::context::RequestContext;
use crate::error::{CoreError, CoreResult};
use crate::hashing::HashingStream;
use crate::quota::QuotaChecker;

pub struct NewUpload {
    pub folder_id: FolderId,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub reader: ByteStream,
    pub metadata: Vec<(String, String)>,
}

pub struct UploadOrchestrator<M, Q, P, QC> {
    object_store: Arc<GenericObjectStore>,
    metadata_store: Arc<M>,
    scan_queue: Arc<Q>,
    publisher: Arc<P>,
    quota: Arc<QC>,
    config: Arc<DocflowConfig>,
}

impl<M, Q, P, QC> UploadOrchestrator<M, Q, P, QC>
where
    M: MetadataStore,
    Q: ScanQueue,
    P: EventPublisher,
    QC: QuotaChecker,
{
    pub fn new(
        object_store: Arc<GenericObjectStore>,
        metadata_store: Arc<M>,
        scan_queue: Arc<Q>,
        publisher: Arc<P>,
        quota: Arc<QC>,
        config: Arc<DocflowConfig>,
    ) -> Self {
        Self {
            object_store,
            metadata_store,
            scan_queue,
            publisher,
            quota,
            config,
        }
    }

    pub async fn upload(&self, ctx: &RequestContext, upload: NewUpload) -> CoreResult<DocumentId> {
        self.validate_preconditions(&upload)?;

        let authorized = self
            .metadata_store
            .authorize(
                &ctx.roles,
                ResourceType::Folder,
                *upload.folder_id.as_bytes(),
                Some(upload.folder_id),
                PermissionType::Write,
            )
            .await?;
        if !authorized {
            return Err(CoreError::AuthForbidden);
        }

        let folder_active = self
            .metadata_store
            .folder_is_active(ctx.tenant_id, upload.folder_id)
            .await?;
        if !folder_active {
            return Err(CoreError::NotFound);
        }

        self.quota.check(ctx.tenant_id, upload.size).await?;

        let document_id = DocumentId::generate();
        let version_id = VersionId::generate();
        let temp_key = docflow_util::StorageKey::temporary(ctx.tenant_id, document_id, 1);

        let (hashed_reader, digest) = HashingStream::wrap(upload.reader);
        self.object_store
            .put_stream(
                ctx.tenant_id,
                &temp_key,
                hashed_reader,
                upload.size,
                &upload.content_type,
                None,
            )
            .await?;
        let content_hash = digest.finalize_hex();

        let new_document = NewDocument {
            id: document_id,
            tenant_id: ctx.tenant_id,
            folder_id: upload.folder_id,
            owner_id: ctx.user_id,
            name: upload.name,
            content_type: upload.content_type,
        };
        let new_version = NewVersion {
            id: version_id,
            size_bytes: upload.size as i64,
            content_hash,
            storage_key: temp_key.to_string(),
            created_by: ctx.user_id,
        };

        let (document_id, version_id, version) = self.create_document_retrying_on_id_conflict(new_document, new_version).await?;

        if !upload.metadata.is_empty() {
            self.metadata_store
                .upsert_metadata(ctx.tenant_id, document_id, &upload.metadata)
                .await?;
        }

        if let Err(enqueue_err) = self
            .scan_queue
            .send(NewScanTask {
                tenant_id: ctx.tenant_id,
                document_id,
                version_id,
                storage_key: version.storage_key.clone(),
            })
            .await
        {
            if let Err(compensation_err) = self
                .metadata_store
                .transition_version(version_id, DocumentStatus::Processing, DocumentStatus::Failed, None)
                .await
            {
                tracing::error!(
                    %document_id, %version_id, error = %compensation_err,
                    "failed to mark version failed after scan enqueue failure"
                );
            }
            docflow_metrics::UPLOADS_TOTAL.with_label_values(&["enqueue_failed"]).inc();
            return Err(enqueue_err.into());
        }

        let degraded = match self.scan_queue.visible_depth().await {
            Ok(depth) => {
                docflow_metrics::QUEUE_DEPTH.set(depth as i64);
                depth > self.config.backpressure_queue_depth
            }
            Err(_) => false,
        };

        let event = EventEnvelope::new(
            ctx.tenant_id,
            EventType::DocumentUploaded,
            document_id.to_string(),
            serde_json::json!({ "degraded": degraded }),
        );
        if let Err(error) = self.publisher.publish(event).await {
            tracing::warn!(%document_id, %error, "failed to publish document.uploaded event");
        }

        docflow_metrics::UPLOADS_TOTAL.with_label_values(&["accepted"]).inc();
        Ok(document_id)
    }

    /// Creates the document row, regenerating `document_id`/`version_id` and retrying once if
    /// the id collides with an existing row. The staged object already sitting at
    /// `new_version.storage_key` is reused as-is on the retry; only the metadata row's ids
    /// change, since the scan worker derives the permanent key from the document id it's handed
    /// rather than the path of the temp object it copies from.
    async fn create_document_retrying_on_id_conflict(
        &self,
        mut new_document: NewDocument,
        mut new_version: NewVersion,
    ) -> CoreResult<(DocumentId, VersionId, DocumentVersion)> {
        match self.metadata_store.create_document(new_document.clone(), new_version.clone()).await {
            Ok((document, version)) => return Ok((document.id, version.id, version)),
            Err(docflow_metadata::MetadataError::Conflict { .. }) => {
                tracing::warn!(
                    document_id = %new_document.id, version_id = %new_version.id,
                    "document id collided on create, retrying with a new id"
                );
                new_document.id = DocumentId::generate();
                new_version.id = VersionId::generate();
            }
            Err(other) => return Err(other.into()),
        }

        let (document, version) = self.metadata_store.create_document(new_document, new_version).await?;
        Ok((document.id, version.id, version))
    }

    fn validate_preconditions(&self, upload: &NewUpload) -> CoreResult<()> {
        if upload.size == 0 || upload.size > self.config.max_object_size_bytes {
            return Err(CoreError::Validation(format!(
                "size {} outside allowed range (0, {}]",
                upload.size, self.config.max_object_size_bytes
            )));
        }
        if !self
            .config
            .permitted_content_types
            .iter()
            .any(|allowed| allowed == &upload.content_type)
        {
            return Err(CoreError::Validation(format!(
                "content type {:?} is not permitted",
                upload.content_type
            )));
        }
        Ok(())
    }
}
