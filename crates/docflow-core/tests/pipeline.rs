//! End-to-end coverage across upload (C6), the scan worker (C7), and retrieval (C8), wired
//! together with in-memory doubles for every adapter. These exercise the scenarios in the
//! upload/scan/retrieval contract rather than any single module in isolation.

use std::sync::Arc;

use bytes::Bytes;
use docflow_core::{
    DocflowConfig, NewUpload, NoopQuotaChecker, PlainTextExtractor, RequestContext, RetrievalOrchestrator,
    TextExtractor, UploadOrchestrator,
};
use docflow_events::RecordingPublisher;
use docflow_metadata::{InMemoryMetadataStore, MetadataStore, Permission, PermissionType, ResourceType};
use docflow_object_store::{ByteStream, GenericObjectStore, LocalObjectStore};
use docflow_scan_queue::{InMemoryScanQueue, ScanQueue};
use docflow_scanner::{FixtureScannerClient, ScannerClient, Verdict};
use docflow_search::SearchIndex;
use docflow_util::{FolderId, RoleId, TenantId, UserId};
use tokio::io::AsyncReadExt;

fn bytes_stream(data: &'static [u8]) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(Bytes::from(data)) }))
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

struct Harness {
    object_store: Arc<GenericObjectStore>,
    metadata_store: Arc<InMemoryMetadataStore>,
    scan_queue: Arc<InMemoryScanQueue>,
    search_index: Arc<SearchIndex>,
    publisher: Arc<RecordingPublisher>,
    config: Arc<DocflowConfig>,
    _tempdir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let tempdir = tempfile::TempDir::new().unwrap();
        Self {
            object_store: Arc::new(GenericObjectStore::Local(Arc::new(LocalObjectStore::new()))),
            metadata_store: Arc::new(InMemoryMetadataStore::new()),
            scan_queue: Arc::new(InMemoryScanQueue::new()),
            search_index: Arc::new(SearchIndex::open(tempdir.path(), None).unwrap()),
            publisher: Arc::new(RecordingPublisher::new()),
            config: Arc::new(DocflowConfig::default()),
            _tempdir: tempdir,
        }
    }

    fn grant_folder_write(&self, folder: FolderId, role: RoleId) {
        self.metadata_store.grant(Permission {
            resource_type: ResourceType::Folder,
            resource_id: *folder.as_bytes(),
            role_id: role,
            permission_type: PermissionType::Write,
        });
    }

    fn grant_folder_read(&self, folder: FolderId, role: RoleId) {
        self.metadata_store.grant(Permission {
            resource_type: ResourceType::Folder,
            resource_id: *folder.as_bytes(),
            role_id: role,
            permission_type: PermissionType::Read,
        });
    }

    fn grant_document_read(&self, document: docflow_util::DocumentId, role: RoleId) {
        self.metadata_store.grant(Permission {
            resource_type: ResourceType::Document,
            resource_id: *document.as_bytes(),
            role_id: role,
            permission_type: PermissionType::Read,
        });
    }

    fn upload_orchestrator(
        &self,
    ) -> UploadOrchestrator<InMemoryMetadataStore, InMemoryScanQueue, RecordingPublisher, NoopQuotaChecker> {
        UploadOrchestrator::new(
            self.object_store.clone(),
            self.metadata_store.clone(),
            self.scan_queue.clone(),
            self.publisher.clone(),
            Arc::new(NoopQuotaChecker),
            self.config.clone(),
        )
    }

    fn retrieval_orchestrator(&self) -> RetrievalOrchestrator<InMemoryMetadataStore, RecordingPublisher> {
        RetrievalOrchestrator::new(
            self.object_store.clone(),
            self.metadata_store.clone(),
            self.publisher.clone(),
            self.config.clone(),
        )
    }

    /// Runs one scan task end to end, mirroring `scan_worker::Worker::process` without
    /// standing up the full pool (so a single task can be driven deterministically).
    async fn run_one_scan_task(&self, scanner: &FixtureScannerClient) {
        let tasks = self.scan_queue.receive(1, self.config.scan_lease).await.unwrap();
        let task = tasks.into_iter().next().expect("a scan task was enqueued");

        let object = self.object_store.get_stream(&task.storage_key).await.unwrap();
        let verdict = scanner.scan(object.stream, object.size).await.unwrap();

        let document = self
            .metadata_store
            .get_document(task.tenant_id, task.document_id)
            .await
            .unwrap();

        match verdict {
            Verdict::Clean => {
                let perm_key =
                    docflow_util::StorageKey::permanent(task.tenant_id, document.folder_id, task.document_id, 1);
                self.object_store.copy(&task.storage_key, &perm_key.to_string()).await.unwrap();
                self.metadata_store
                    .transition_version(
                        task.version_id,
                        docflow_metadata::DocumentStatus::Processing,
                        docflow_metadata::DocumentStatus::Available,
                        Some(&perm_key.to_string()),
                    )
                    .await
                    .unwrap();
                self.object_store.delete(&task.storage_key).await.unwrap();

                let extracted = self.object_store.get_stream(&perm_key.to_string()).await.unwrap();
                let extractor = PlainTextExtractor;
                let text_content = extractor
                    .extract(extracted.stream, &document.content_type)
                    .await
                    .unwrap_or_default();

                self.search_index
                    .upsert(docflow_search::UpsertDoc {
                        document_id: task.document_id,
                        tenant_id: task.tenant_id,
                        text_content,
                        metadata: vec![],
                        folder_id: Some(document.folder_id),
                        name: document.name.clone(),
                        content_type: document.content_type.clone(),
                        created_at: document.created_at,
                    })
                    .await
                    .unwrap();
                self.search_index.commit().await.unwrap();
            }
            Verdict::Infected(_) => {
                let quar_key = docflow_util::StorageKey::quarantine(task.tenant_id, task.document_id, 1);
                self.object_store.copy(&task.storage_key, &quar_key.to_string()).await.unwrap();
                self.metadata_store
                    .transition_version(
                        task.version_id,
                        docflow_metadata::DocumentStatus::Processing,
                        docflow_metadata::DocumentStatus::Quarantined,
                        Some(&quar_key.to_string()),
                    )
                    .await
                    .unwrap();
                self.object_store.delete(&task.storage_key).await.unwrap();
            }
            Verdict::Indeterminate => panic!("fixture scanner never returns Indeterminate"),
        }
        self.scan_queue.delete(task.task_id).await.unwrap();
    }
}

/// A clean upload lands `Available`, is downloadable, and its outcome event is published.
#[tokio::test]
async fn clean_upload_is_scanned_and_becomes_downloadable() {
    let harness = Harness::new();
    let tenant = TenantId::generate();
    let user = UserId::generate();
    let role = RoleId::generate();
    let folder = FolderId::generate();
    harness.grant_folder_write(folder, role);
    harness.grant_folder_read(folder, role);
    let ctx = RequestContext::new(tenant, user, vec![role]);

    let body = b"hello docflow";
    let document_id = harness
        .upload_orchestrator()
        .upload(
            &ctx,
            NewUpload {
                folder_id: folder,
                name: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: body.len() as u64,
                reader: bytes_stream(body),
                metadata: vec![("source".to_string(), "integration-test".to_string())],
            },
        )
        .await
        .unwrap();

    let scanner = FixtureScannerClient::new();
    harness.run_one_scan_task(&scanner).await;

    let document = harness.metadata_store.get_document(tenant, document_id).await.unwrap();
    assert_eq!(document.status, docflow_metadata::DocumentStatus::Available);

    let download = harness.retrieval_orchestrator().download(&ctx, document_id).await.unwrap();
    let mut buf = Vec::new();
    let mut reader = tokio_util::io::StreamReader::new(download.stream);
    reader.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, body);
    assert_eq!(download.filename, "notes.txt");
    assert_eq!(download.content_type, "text/plain");

    let events = harness.publisher.recorded().await;
    assert!(events.iter().any(|e| e.event_type == "document.uploaded"));
    assert!(events.iter().any(|e| e.event_type == "document.downloaded"));
}

/// An infected upload is quarantined, never reaches `Available`, and is never indexed.
#[tokio::test]
async fn infected_upload_is_quarantined_and_not_indexed() {
    let harness = Harness::new();
    let tenant = TenantId::generate();
    let user = UserId::generate();
    let role = RoleId::generate();
    let folder = FolderId::generate();
    harness.grant_folder_write(folder, role);
    let ctx = RequestContext::new(tenant, user, vec![role]);

    let body: &[u8] = b"eicar-signature-bytes";
    let scanner = FixtureScannerClient::new().with_signature(sha256_hex(body), Verdict::Infected("Eicar-Test".to_string()));

    let document_id = harness
        .upload_orchestrator()
        .upload(
            &ctx,
            NewUpload {
                folder_id: folder,
                name: "payload.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: body.len() as u64,
                reader: bytes_stream(body),
                metadata: vec![],
            },
        )
        .await
        .unwrap();

    harness.run_one_scan_task(&scanner).await;

    let document = harness.metadata_store.get_document(tenant, document_id).await.unwrap();
    assert_eq!(document.status, docflow_metadata::DocumentStatus::Quarantined);

    let page = harness
        .search_index
        .search(tenant, docflow_search::SearchQuery::default(), docflow_search::Pagination::default())
        .unwrap();
    assert!(page.items.is_empty());

    let download_err = harness
        .retrieval_orchestrator()
        .download(&RequestContext::new(tenant, user, vec![RoleId::generate()]), document_id)
        .await
        .unwrap_err();
    assert!(matches!(download_err, docflow_core::CoreError::Conflict(_)));
}

/// A document in one tenant is invisible to another tenant's requests, surfaced as
/// `NotFound` rather than `Forbidden` so existence never leaks across tenant boundaries.
#[tokio::test]
async fn cross_tenant_download_is_not_found_not_forbidden() {
    let harness = Harness::new();
    let owner_tenant = TenantId::generate();
    let owner_role = RoleId::generate();
    let folder = FolderId::generate();
    harness.grant_folder_write(folder, owner_role);
    harness.grant_folder_read(folder, owner_role);
    let owner_ctx = RequestContext::new(owner_tenant, UserId::generate(), vec![owner_role]);

    let body = b"tenant-scoped content";
    let document_id = harness
        .upload_orchestrator()
        .upload(
            &owner_ctx,
            NewUpload {
                folder_id: folder,
                name: "secret.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: body.len() as u64,
                reader: bytes_stream(body),
                metadata: vec![],
            },
        )
        .await
        .unwrap();
    harness.run_one_scan_task(&FixtureScannerClient::new()).await;

    let attacker_tenant = TenantId::generate();
    let attacker_ctx = RequestContext::new(attacker_tenant, UserId::generate(), vec![RoleId::generate()]);

    let err = harness
        .retrieval_orchestrator()
        .download(&attacker_ctx, document_id)
        .await
        .unwrap_err();
    assert!(matches!(err, docflow_core::CoreError::NotFound));
}

/// A batch with any forbidden member fails entirely before any archive bytes stream,
/// and a second, all-permitted batch against the same documents succeeds.
#[tokio::test]
async fn batch_download_is_all_or_nothing_on_forbidden_member() {
    let harness = Harness::new();
    let tenant = TenantId::generate();
    let owner_role = RoleId::generate();
    let folder = FolderId::generate();
    harness.grant_folder_write(folder, owner_role);
    harness.grant_folder_read(folder, owner_role);
    let ctx = RequestContext::new(tenant, UserId::generate(), vec![owner_role]);

    let mut document_ids = Vec::new();
    for i in 0..2 {
        let body = format!("document body {i}").into_bytes();
        let body: &'static [u8] = Box::leak(body.into_boxed_slice());
        let document_id = harness
            .upload_orchestrator()
            .upload(
                &ctx,
                NewUpload {
                    folder_id: folder,
                    name: format!("doc-{i}.txt"),
                    content_type: "text/plain".to_string(),
                    size: body.len() as u64,
                    reader: bytes_stream(body),
                    metadata: vec![],
                },
            )
            .await
            .unwrap();
        harness.run_one_scan_task(&FixtureScannerClient::new()).await;
        document_ids.push(document_id);
    }

    // A role with read access to the first document only, so the second is the sole
    // forbidden member of the batch.
    let partial_role = RoleId::generate();
    harness.grant_document_read(document_ids[0], partial_role);
    let forbidden_ctx = RequestContext::new(tenant, UserId::generate(), vec![partial_role]);
    let mut sink = Vec::new();
    let err = harness
        .retrieval_orchestrator()
        .batch_download(&forbidden_ctx, &document_ids, &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, docflow_core::CoreError::AuthForbiddenMany(ref ids) if ids == &[document_ids[1]]));
    assert!(sink.is_empty());

    let mut archive = Vec::new();
    harness
        .retrieval_orchestrator()
        .batch_download(&ctx, &document_ids, &mut archive)
        .await
        .unwrap();
    assert!(!archive.is_empty());
}
