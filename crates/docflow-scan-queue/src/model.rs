//! The scan task message (§6.2): enqueued by the upload orchestrator, consumed by the scan
//! worker pool. Lives only in this crate — C3 owns its own storage independent of the
//! metadata store.

use chrono::{DateTime, Utc};
use docflow_util::{DocumentId, TaskId, TenantId, VersionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTask {
    pub task_id: TaskId,
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub version_id: VersionId,
    pub storage_key: String,
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScanTask {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub version_id: VersionId,
    pub storage_key: String,
}
