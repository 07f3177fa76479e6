//! Entity types owned by the metadata store (§3): `Document`, `DocumentVersion`,
//! `DocumentMetadata`, `Permission`, `Event`. These are the shapes returned from and accepted by
//! [`crate::MetadataStore`]; the Postgres backend additionally keeps diesel row types in
//! [`crate::postgres::schema`] and [`crate::postgres::rows`] that map onto these.

use chrono::{DateTime, Utc};
use docflow_util::{DocumentId, EventId, FolderId, TenantId, UserId, VersionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Available,
    Quarantined,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Available => "available",
            DocumentStatus::Quarantined => "quarantined",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Invariant I1: once a status is terminal, `content_type`/`size_bytes`/`content_hash`
    /// of the latest version are immutable.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DocumentStatus::Available | DocumentStatus::Quarantined | DocumentStatus::Failed
        )
    }

    /// Invariant I4: the namespace a version's bytes live in must agree with its status.
    pub fn matching_namespace(self) -> Option<docflow_util::Namespace> {
        match self {
            DocumentStatus::Processing => Some(docflow_util::Namespace::Temporary),
            DocumentStatus::Available => Some(docflow_util::Namespace::Permanent),
            DocumentStatus::Quarantined => Some(docflow_util::Namespace::Quarantine),
            DocumentStatus::Failed => None,
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "available" => Ok(DocumentStatus::Available),
            "quarantined" => Ok(DocumentStatus::Quarantined),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    pub folder_id: FolderId,
    pub owner_id: UserId,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    pub version_number: i32,
    pub size_bytes: i64,
    pub content_hash: String,
    pub status: DocumentStatus,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

/// A new document plus its first version, as handed to [`crate::MetadataStore::create_document`].
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    pub folder_id: FolderId,
    pub owner_id: UserId,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct NewVersion {
    pub id: VersionId,
    pub size_bytes: i64,
    pub content_hash: String,
    pub storage_key: String,
    pub created_by: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadataEntry {
    pub document_id: DocumentId,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Document,
    Folder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Read,
    Write,
    Delete,
    Admin,
}

#[derive(Debug, Clone)]
pub struct Permission {
    pub resource_type: ResourceType,
    pub resource_id: [u8; 16],
    pub role_id: docflow_util::RoleId,
    pub permission_type: PermissionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DocumentUploaded,
    DocumentProcessed,
    DocumentQuarantined,
    DocumentDownloaded,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::DocumentUploaded => "document.uploaded",
            EventType::DocumentProcessed => "document.processed",
            EventType::DocumentQuarantined => "document.quarantined",
            EventType::DocumentDownloaded => "document.downloaded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub event_type: EventType,
    pub resource_id: [u8; 16],
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Deterministic `(created_at desc, id desc)` pagination cursor for `list_by_folder`.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: u32,
    pub cursor: Option<(DateTime<Utc>, DocumentId)>,
}

impl Pagination {
    pub fn first(limit: u32) -> Self {
        Self { limit, cursor: None }
    }
}

pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<(DateTime<Utc>, DocumentId)>,
}
