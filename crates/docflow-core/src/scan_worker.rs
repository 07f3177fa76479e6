//! Scan worker pool (C7): §4.7's receive → scan → CAS-transition → ack/nack loop. The pool is
//! a `Vec<JoinHandle<()>>` spawned directly, no actor framework, shutting down cooperatively via
//! a shared `CancellationToken` — matching the teacher's own cancellation-token plumbing.

use std::sync::Arc;
use std::time::Duration;

use docflow_metadata::{DocumentStatus, MetadataStore};
use docflow_object_store::GenericObjectStore;
use docflow_scan_queue::{ScanQueue, ScanTask};
use docflow_scanner::{ScannerClient, Verdict};
use docflow_search::{MetadataPair, SearchIndex, UpsertDoc};
use docflow_util::StorageKey;
use tokio_util::sync::CancellationToken;

use docflow_events::{EventEnvelope, EventPublisher, EventType};

use crate::config::DocflowConfig;
use crate::extractor::TextExtractor;

/// No tasks were visible; back off briefly before polling the queue again, instead of
/// spinning a worker thread at 100% CPU when the queue is empty.
const EMPTY_POLL_INTERVAL: Duration = Duration::from_secs(2);

struct Worker<M, Q, S, P, E> {
    object_store: Arc<GenericObjectStore>,
    metadata_store: Arc<M>,
    scan_queue: Arc<Q>,
    scanner: Arc<S>,
    search_index: Arc<SearchIndex>,
    publisher: Arc<P>,
    extractor: Arc<E>,
    config: Arc<DocflowConfig>,
}

pub struct ScanWorkerPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
    cancel: CancellationToken,
}

impl ScanWorkerPool {
    pub fn spawn<M, Q, S, P, E>(
        count: usize,
        object_store: Arc<GenericObjectStore>,
        metadata_store: Arc<M>,
        scan_queue: Arc<Q>,
        scanner: Arc<S>,
        search_index: Arc<SearchIndex>,
        publisher: Arc<P>,
        extractor: Arc<E>,
        config: Arc<DocflowConfig>,
    ) -> Self
    where
        M: MetadataStore,
        Q: ScanQueue,
        S: ScannerClient,
        P: EventPublisher,
        E: TextExtractor,
    {
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            let worker = Worker {
                object_store: object_store.clone(),
                metadata_store: metadata_store.clone(),
                scan_queue: scan_queue.clone(),
                scanner: scanner.clone(),
                search_index: search_index.clone(),
                publisher: publisher.clone(),
                extractor: extractor.clone(),
                config: config.clone(),
            };
            let worker_cancel = cancel.clone();
            handles.push(tokio::spawn(async move { worker.run(worker_cancel).await }));
        }
        Self { handles, cancel }
    }

    /// Signals every worker to stop pulling new tasks and waits for in-flight ones to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl<M, Q, S, P, E> Worker<M, Q, S, P, E>
where
    M: MetadataStore,
    Q: ScanQueue,
    S: ScannerClient,
    P: EventPublisher,
    E: TextExtractor,
{
    async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let tasks = match self.scan_queue.receive(1, self.config.scan_lease).await {
                Ok(tasks) => tasks,
                Err(error) => {
                    tracing::warn!(%error, "scan queue receive failed");
                    tokio::time::sleep(EMPTY_POLL_INTERVAL).await;
                    continue;
                }
            };
            if tasks.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(EMPTY_POLL_INTERVAL) => {}
                    _ = cancel.cancelled() => return,
                }
                continue;
            }
            for task in tasks {
                self.process(task).await;
            }
        }
    }

    async fn process(&self, task: ScanTask) {
        let budget = self
            .config
            .scan_lease
            .saturating_sub(self.config.lease_safety_margin);

        let started = tokio::time::Instant::now();
        let outcome = tokio::time::timeout(budget, self.scan_one(&task)).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(Ok(())) => {
                docflow_metrics::SCAN_DURATION_SECONDS
                    .with_label_values(&["ok"])
                    .observe(elapsed);
            }
            Ok(Err(error)) => {
                docflow_metrics::SCAN_DURATION_SECONDS
                    .with_label_values(&["error"])
                    .observe(elapsed);
                self.nack(&task, error).await;
            }
            Err(_timeout) => {
                docflow_metrics::SCAN_DURATION_SECONDS
                    .with_label_values(&["timeout"])
                    .observe(elapsed);
                tracing::warn!(task_id = %task.task_id, "scan exceeded lease safety margin, nacking");
                self.nack(
                    &task,
                    NackReason {
                        retryable: true,
                        permanent: false,
                    },
                )
                .await;
            }
        }
    }

    /// Runs one task end to end; returns `Err` with a classification on any failure so
    /// `process` can decide between a backoff nack and a permanent dead-letter.
    async fn scan_one(&self, task: &ScanTask) -> Result<(), NackReason> {
        let object = self
            .object_store
            .get_stream(&task.storage_key)
            .await
            .map_err(|error| classify_store_error(&error))?;

        let verdict = self
            .scanner
            .scan(object.stream, object.size)
            .await
            .map_err(|_| NackReason {
                retryable: true,
                permanent: false,
            })?;

        match verdict {
            Verdict::Clean => self.handle_clean(task).await,
            Verdict::Infected(signature) => self.handle_infected(task, signature).await,
            Verdict::Indeterminate => Err(NackReason {
                retryable: true,
                permanent: false,
            }),
        }
    }

    async fn handle_clean(&self, task: &ScanTask) -> Result<(), NackReason> {
        let document = self
            .metadata_store
            .get_document(task.tenant_id, task.document_id)
            .await
            .map_err(permanent)?;

        let perm_key = StorageKey::permanent(task.tenant_id, document.folder_id, task.document_id, 1);

        self.object_store
            .copy(&task.storage_key, &perm_key.to_string())
            .await
            .map_err(|error| classify_store_error(&error))?;

        let cas_result = self
            .metadata_store
            .transition_version(
                task.version_id,
                DocumentStatus::Processing,
                DocumentStatus::Available,
                Some(&perm_key.to_string()),
            )
            .await;

        let already_handled_by_another_worker = match cas_result {
            Ok(_) => false,
            Err(docflow_metadata::MetadataError::Conflict { .. }) => true,
            Err(other) => return Err(permanent(other)),
        };

        if already_handled_by_another_worker {
            let _ = self.object_store.delete(&perm_key.to_string()).await;
        } else {
            let _ = self.object_store.delete(&task.storage_key).await;

            let extracted = self
                .object_store
                .get_stream(&perm_key.to_string())
                .await
                .map_err(|error| classify_store_error(&error))?;
            let text_content = match self.extractor.extract(extracted.stream, &document.content_type).await {
                Ok(text) => text,
                Err(_) => String::new(),
            };

            let metadata_pairs = self
                .metadata_store
                .list_metadata(task.tenant_id, task.document_id)
                .await
                .map_err(permanent)?
                .into_iter()
                .map(|entry| MetadataPair {
                    key: entry.key,
                    value: entry.value,
                })
                .collect();

            self.search_index
                .upsert(UpsertDoc {
                    document_id: task.document_id,
                    tenant_id: task.tenant_id,
                    text_content,
                    metadata: metadata_pairs,
                    folder_id: Some(document.folder_id),
                    name: document.name.clone(),
                    content_type: document.content_type.clone(),
                    created_at: document.created_at,
                })
                .await
                .map_err(|_| NackReason {
                    retryable: true,
                    permanent: false,
                })?;
        }

        self.emit(task.tenant_id, EventType::DocumentProcessed, task.document_id.to_string())
            .await;
        let _ = self.scan_queue.delete(task.task_id).await;
        docflow_metrics::SCAN_OUTCOMES_TOTAL.with_label_values(&["clean"]).inc();
        Ok(())
    }

    async fn handle_infected(&self, task: &ScanTask, signature: String) -> Result<(), NackReason> {
        let quar_key = StorageKey::quarantine(task.tenant_id, task.document_id, 1);

        self.object_store
            .copy(&task.storage_key, &quar_key.to_string())
            .await
            .map_err(|error| classify_store_error(&error))?;

        let cas_result = self
            .metadata_store
            .transition_version(
                task.version_id,
                DocumentStatus::Processing,
                DocumentStatus::Quarantined,
                Some(&quar_key.to_string()),
            )
            .await;

        match cas_result {
            Ok(_) => {
                let _ = self.object_store.delete(&task.storage_key).await;
            }
            Err(docflow_metadata::MetadataError::Conflict { .. }) => {
                let _ = self.object_store.delete(&quar_key.to_string()).await;
            }
            Err(other) => return Err(permanent(other)),
        }

        tracing::warn!(document_id = %task.document_id, %signature, "document quarantined");
        self.emit(task.tenant_id, EventType::DocumentQuarantined, task.document_id.to_string())
            .await;
        let _ = self.scan_queue.delete(task.task_id).await;
        docflow_metrics::SCAN_OUTCOMES_TOTAL.with_label_values(&["infected"]).inc();
        Ok(())
    }

    async fn nack(&self, task: &ScanTask, reason: NackReason) {
        if reason.permanent || task.attempt >= docflow_util::time::MAX_SCAN_ATTEMPTS {
            if let Err(error) = self
                .metadata_store
                .transition_version(task.version_id, DocumentStatus::Processing, DocumentStatus::Failed, None)
                .await
            {
                tracing::error!(task_id = %task.task_id, %error, "failed to transition version to failed");
            }
            // Let the queue's own nack perform the dead-letter write; it already knows to move
            // an exhausted-attempts task into its dead-letter store instead of deleting it.
            if let Err(error) = self.scan_queue.nack(task.task_id, Duration::ZERO).await {
                tracing::error!(task_id = %task.task_id, %error, "failed to dead-letter scan task");
            }
            docflow_metrics::SCAN_OUTCOMES_TOTAL.with_label_values(&["failed"]).inc();
            return;
        }

        let delay = docflow_util::time::backoff_for_attempt(task.attempt);
        docflow_metrics::SCAN_RETRIES_TOTAL
            .with_label_values(&[if reason.retryable { "retryable" } else { "permanent" }])
            .inc();
        if let Err(error) = self.scan_queue.nack(task.task_id, delay).await {
            tracing::error!(task_id = %task.task_id, %error, "failed to nack scan task");
        }
    }

    async fn emit(&self, tenant_id: docflow_util::TenantId, event_type: EventType, resource_id: String) {
        let event = EventEnvelope::new(tenant_id, event_type, resource_id, serde_json::json!({}));
        if let Err(error) = self.publisher.publish(event).await {
            tracing::warn!(%error, "failed to publish scan outcome event");
        }
    }
}

struct NackReason {
    retryable: bool,
    permanent: bool,
}

fn permanent<E: std::fmt::Display>(error: E) -> NackReason {
    tracing::error!(%error, "permanent scan worker failure");
    NackReason {
        retryable: false,
        permanent: true,
    }
}

fn classify_store_error(error: &docflow_object_store::StoreError) -> NackReason {
    match error {
        docflow_object_store::StoreError::NotFound(_) => NackReason {
            retryable: false,
            permanent: true,
        },
        _ => NackReason {
            retryable: true,
            permanent: false,
        },
    }
}
