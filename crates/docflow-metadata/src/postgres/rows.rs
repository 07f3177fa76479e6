//! Diesel row types for the Postgres backend, and the boring conversions to/from the domain
//! types in [`crate::models`]. IDs are stored as raw 16-byte `bytea`, matching the opaque-id
//! representation everywhere else in this workspace.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use docflow_util::{DocumentId, EventId, FolderId, RoleId, TenantId, UserId, VersionId};

use crate::models::{Document, DocumentMetadataEntry, DocumentStatus, DocumentVersion, Event, EventType};
use crate::postgres::schema::{document_metadata, document_versions, documents, events};

fn id_bytes<I>(id: I) -> Vec<u8>
where
    I: std::borrow::Borrow<[u8; 16]>,
{
    id.borrow().to_vec()
}

fn parse_id16(bytes: &[u8]) -> [u8; 16] {
    bytes.try_into().expect("id column must be 16 bytes")
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = documents)]
pub struct DocumentRow {
    pub id: Vec<u8>,
    pub tenant_id: Vec<u8>,
    pub folder_id: Vec<u8>,
    pub owner_id: Vec<u8>,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = String;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: DocumentId::from_bytes(parse_id16(&row.id)),
            tenant_id: TenantId::from_bytes(parse_id16(&row.tenant_id)),
            folder_id: FolderId::from_bytes(parse_id16(&row.folder_id)),
            owner_id: UserId::from_bytes(parse_id16(&row.owner_id)),
            name: row.name,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocumentRow {
    pub id: Vec<u8>,
    pub tenant_id: Vec<u8>,
    pub folder_id: Vec<u8>,
    pub owner_id: Vec<u8>,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: String,
}

impl NewDocumentRow {
    pub fn new(
        id: DocumentId,
        tenant_id: TenantId,
        folder_id: FolderId,
        owner_id: UserId,
        name: String,
        content_type: String,
        size_bytes: i64,
    ) -> Self {
        Self {
            id: id_bytes(id.as_bytes()),
            tenant_id: id_bytes(tenant_id.as_bytes()),
            folder_id: id_bytes(folder_id.as_bytes()),
            owner_id: id_bytes(owner_id.as_bytes()),
            name,
            content_type,
            size_bytes,
            status: DocumentStatus::Processing.as_str().to_string(),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = document_versions)]
pub struct DocumentVersionRow {
    pub id: Vec<u8>,
    pub document_id: Vec<u8>,
    pub version_number: i32,
    pub size_bytes: i64,
    pub content_hash: String,
    pub status: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Vec<u8>,
}

impl TryFrom<DocumentVersionRow> for DocumentVersion {
    type Error = String;

    fn try_from(row: DocumentVersionRow) -> Result<Self, Self::Error> {
        Ok(DocumentVersion {
            id: VersionId::from_bytes(parse_id16(&row.id)),
            document_id: DocumentId::from_bytes(parse_id16(&row.document_id)),
            version_number: row.version_number,
            size_bytes: row.size_bytes,
            content_hash: row.content_hash,
            status: row.status.parse()?,
            storage_key: row.storage_key,
            created_at: row.created_at,
            created_by: UserId::from_bytes(parse_id16(&row.created_by)),
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = document_versions)]
pub struct NewDocumentVersionRow {
    pub id: Vec<u8>,
    pub document_id: Vec<u8>,
    pub version_number: i32,
    pub size_bytes: i64,
    pub content_hash: String,
    pub status: String,
    pub storage_key: String,
    pub created_by: Vec<u8>,
}

impl NewDocumentVersionRow {
    pub fn new(
        id: VersionId,
        document_id: DocumentId,
        version_number: i32,
        size_bytes: i64,
        content_hash: String,
        storage_key: String,
        created_by: UserId,
    ) -> Self {
        Self {
            id: id_bytes(id.as_bytes()),
            document_id: id_bytes(document_id.as_bytes()),
            version_number,
            size_bytes,
            content_hash,
            status: DocumentStatus::Processing.as_str().to_string(),
            storage_key,
            created_by: id_bytes(created_by.as_bytes()),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = document_metadata)]
pub struct DocumentMetadataRow {
    pub document_id: Vec<u8>,
    pub key: String,
    pub value: String,
}

impl From<DocumentMetadataRow> for DocumentMetadataEntry {
    fn from(row: DocumentMetadataRow) -> Self {
        DocumentMetadataEntry {
            document_id: DocumentId::from_bytes(parse_id16(&row.document_id)),
            key: row.key,
            value: row.value,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = events)]
pub struct EventRow {
    pub id: Vec<u8>,
    pub tenant_id: Vec<u8>,
    pub event_type: String,
    pub resource_id: Vec<u8>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = String;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = match row.event_type.as_str() {
            "document.uploaded" => EventType::DocumentUploaded,
            "document.processed" => EventType::DocumentProcessed,
            "document.quarantined" => EventType::DocumentQuarantined,
            "document.downloaded" => EventType::DocumentDownloaded,
            other => return Err(format!("unknown event type {other:?}")),
        };
        Ok(Event {
            id: EventId::from_bytes(parse_id16(&row.id)),
            tenant_id: TenantId::from_bytes(parse_id16(&row.tenant_id)),
            event_type,
            resource_id: parse_id16(&row.resource_id),
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub id: Vec<u8>,
    pub tenant_id: Vec<u8>,
    pub event_type: String,
    pub resource_id: Vec<u8>,
    pub payload: serde_json::Value,
}

pub fn role_id_bytes(role: RoleId) -> Vec<u8> {
    id_bytes(role.as_bytes())
}
