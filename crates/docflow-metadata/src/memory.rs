//! An in-memory `MetadataStore`, keyed by tenant, for unit tests that don't want a live
//! Postgres instance. Mirrors how this lineage's own test suites favor fast in-memory doubles
//! over spinning up a real database per test.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use docflow_util::{DocumentId, EventId, FolderId, RoleId, TenantId, VersionId};

use crate::error::{MetadataError, MetadataResult};
use crate::models::{
    Document, DocumentMetadataEntry, DocumentStatus, DocumentVersion, Event, EventType, NewDocument,
    NewVersion, Page, Pagination, Permission, PermissionType, ResourceType,
};
use crate::store::MetadataStore;

#[derive(Default)]
struct Tables {
    documents: HashMap<DocumentId, Document>,
    versions: HashMap<VersionId, DocumentVersion>,
    metadata: HashMap<(DocumentId, String), String>,
    permissions: Vec<Permission>,
    folder_parents: HashMap<FolderId, FolderId>,
    soft_deleted_folders: HashSet<FolderId>,
    events: Vec<Event>,
}

#[derive(Default)]
pub struct InMemoryMetadataStore {
    tables: Mutex<Tables>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-only helper: declares `child`'s parent so `folder_ancestry` has something to walk.
    pub fn set_folder_parent(&self, child: FolderId, parent: FolderId) {
        self.tables.lock().unwrap().folder_parents.insert(child, parent);
    }

    pub fn soft_delete_folder(&self, folder_id: FolderId) {
        self.tables.lock().unwrap().soft_deleted_folders.insert(folder_id);
    }

    pub fn grant(&self, permission: Permission) {
        self.tables.lock().unwrap().permissions.push(permission);
    }
}

impl MetadataStore for InMemoryMetadataStore {
    async fn create_document(
        &self,
        document: NewDocument,
        initial_version: NewVersion,
    ) -> MetadataResult<(Document, DocumentVersion)> {
        let mut tables = self.tables.lock().unwrap();
        if tables.documents.contains_key(&document.id) {
            return Err(MetadataError::Conflict {
                expected: "absent".to_string(),
                actual: "present".to_string(),
            });
        }
        let now = docflow_util::time::now();
        let doc = Document {
            id: document.id,
            tenant_id: document.tenant_id,
            folder_id: document.folder_id,
            owner_id: document.owner_id,
            name: document.name,
            content_type: document.content_type,
            size_bytes: initial_version.size_bytes,
            status: DocumentStatus::Processing,
            created_at: now,
            updated_at: now,
        };
        let version = DocumentVersion {
            id: initial_version.id,
            document_id: document.id,
            version_number: 1,
            size_bytes: initial_version.size_bytes,
            content_hash: initial_version.content_hash,
            status: DocumentStatus::Processing,
            storage_key: initial_version.storage_key,
            created_at: now,
            created_by: initial_version.created_by,
        };
        tables.documents.insert(doc.id, doc.clone());
        tables.versions.insert(version.id, version.clone());
        Ok((doc, version))
    }

    async fn transition_version(
        &self,
        version_id: VersionId,
        from_status: DocumentStatus,
        to_status: DocumentStatus,
        new_storage_key: Option<&str>,
    ) -> MetadataResult<DocumentVersion> {
        let mut tables = self.tables.lock().unwrap();
        let version = tables
            .versions
            .get_mut(&version_id)
            .ok_or(MetadataError::NotFound)?;
        if std::mem::discriminant(&version.status) != std::mem::discriminant(&from_status) {
            return Err(MetadataError::Conflict {
                expected: from_status.as_str().to_string(),
                actual: version.status.as_str().to_string(),
            });
        }
        version.status = to_status;
        if let Some(key) = new_storage_key {
            version.storage_key = key.to_string();
        }
        let updated = version.clone();
        let document_id = updated.document_id;
        if let Some(doc) = tables.documents.get_mut(&document_id) {
            doc.status = to_status;
            doc.updated_at = docflow_util::time::now();
        }
        Ok(updated)
    }

    async fn get_document(&self, tenant_id: TenantId, document_id: DocumentId) -> MetadataResult<Document> {
        let tables = self.tables.lock().unwrap();
        tables
            .documents
            .get(&document_id)
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .ok_or(MetadataError::NotFound)
    }

    async fn get_version(&self, tenant_id: TenantId, version_id: VersionId) -> MetadataResult<DocumentVersion> {
        let tables = self.tables.lock().unwrap();
        let version = tables.versions.get(&version_id).ok_or(MetadataError::NotFound)?;
        let doc = tables
            .documents
            .get(&version.document_id)
            .ok_or(MetadataError::NotFound)?;
        if doc.tenant_id != tenant_id {
            return Err(MetadataError::NotFound);
        }
        Ok(version.clone())
    }

    async fn upsert_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        pairs: &[(String, String)],
    ) -> MetadataResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let belongs = tables
            .documents
            .get(&document_id)
            .map(|d| d.tenant_id == tenant_id)
            .unwrap_or(false);
        if !belongs {
            return Err(MetadataError::NotFound);
        }
        for (key, value) in pairs {
            tables.metadata.insert((document_id, key.clone()), value.clone());
        }
        Ok(())
    }

    async fn delete_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        keys: &[String],
    ) -> MetadataResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let belongs = tables
            .documents
            .get(&document_id)
            .map(|d| d.tenant_id == tenant_id)
            .unwrap_or(false);
        if !belongs {
            return Err(MetadataError::NotFound);
        }
        for key in keys {
            tables.metadata.remove(&(document_id, key.clone()));
        }
        Ok(())
    }

    async fn list_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> MetadataResult<Vec<DocumentMetadataEntry>> {
        let tables = self.tables.lock().unwrap();
        let belongs = tables
            .documents
            .get(&document_id)
            .map(|d| d.tenant_id == tenant_id)
            .unwrap_or(false);
        if !belongs {
            return Err(MetadataError::NotFound);
        }
        Ok(tables
            .metadata
            .iter()
            .filter(|((doc, _), _)| *doc == document_id)
            .map(|((doc, key), value)| DocumentMetadataEntry {
                document_id: *doc,
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn list_by_folder(
        &self,
        tenant_id: TenantId,
        folder_id: FolderId,
        pagination: Pagination,
    ) -> MetadataResult<Page<Document>> {
        let tables = self.tables.lock().unwrap();
        let mut matching: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.tenant_id == tenant_id && d.folder_id == folder_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let start = match pagination.cursor {
            Some((created_at, id)) => matching
                .iter()
                .position(|d| (d.created_at, d.id) < (created_at, id))
                .unwrap_or(matching.len()),
            None => 0,
        };
        let limit = pagination.limit as usize;
        let page: Vec<Document> = matching[start..].iter().take(limit).cloned().collect();
        let next_cursor = page.last().map(|d| (d.created_at, d.id));
        Ok(Page {
            items: page,
            next_cursor,
        })
    }

    async fn direct_permissions(
        &self,
        resource_type: ResourceType,
        resource_id: [u8; 16],
        role_ids: &[RoleId],
    ) -> MetadataResult<HashSet<PermissionType>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .permissions
            .iter()
            .filter(|p| {
                p.resource_type == resource_type
                    && p.resource_id == resource_id
                    && role_ids.contains(&p.role_id)
            })
            .map(|p| p.permission_type)
            .collect())
    }

    async fn folder_ancestry(&self, folder_id: FolderId) -> MetadataResult<Vec<FolderId>> {
        let tables = self.tables.lock().unwrap();
        let mut chain = Vec::new();
        let mut current = folder_id;
        while let Some(parent) = tables.folder_parents.get(&current) {
            chain.push(*parent);
            current = *parent;
        }
        Ok(chain)
    }

    async fn folder_is_active(&self, _tenant_id: TenantId, folder_id: FolderId) -> MetadataResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(!tables.soft_deleted_folders.contains(&folder_id))
    }

    async fn record_event(
        &self,
        tenant_id: TenantId,
        event_type: EventType,
        resource_id: [u8; 16],
        payload: serde_json::Value,
    ) -> MetadataResult<Event> {
        let event = Event {
            id: EventId::generate(),
            tenant_id,
            event_type,
            resource_id,
            payload,
            created_at: docflow_util::time::now(),
        };
        self.tables.lock().unwrap().events.push(event.clone());
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_util::UserId;

    fn new_doc(tenant: TenantId, folder: FolderId) -> (NewDocument, NewVersion) {
        (
            NewDocument {
                id: DocumentId::generate(),
                tenant_id: tenant,
                folder_id: folder,
                owner_id: UserId::generate(),
                name: "report.pdf".to_string(),
                content_type: "application/pdf".to_string(),
            },
            NewVersion {
                id: VersionId::generate(),
                size_bytes: 1024,
                content_hash: "deadbeef".to_string(),
                storage_key: "temp/x/y/1".to_string(),
                created_by: UserId::generate(),
            },
        )
    }

    #[tokio::test]
    async fn create_then_get_document_round_trips() {
        let store = InMemoryMetadataStore::new();
        let tenant = TenantId::generate();
        let folder = FolderId::generate();
        let (doc, version) = new_doc(tenant, folder);
        let (created, created_version) = store.create_document(doc.clone(), version).await.unwrap();
        assert_eq!(created.status, DocumentStatus::Processing);
        assert_eq!(created_version.version_number, 1);

        let fetched = store.get_document(tenant, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn get_document_from_wrong_tenant_is_not_found() {
        let store = InMemoryMetadataStore::new();
        let tenant = TenantId::generate();
        let other_tenant = TenantId::generate();
        let folder = FolderId::generate();
        let (doc, version) = new_doc(tenant, folder);
        let (created, _) = store.create_document(doc, version).await.unwrap();

        let err = store.get_document(other_tenant, created.id).await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound));
    }

    #[tokio::test]
    async fn transition_version_cas_rejects_stale_from_status() {
        let store = InMemoryMetadataStore::new();
        let tenant = TenantId::generate();
        let folder = FolderId::generate();
        let (doc, version) = new_doc(tenant, folder);
        let (_, created_version) = store.create_document(doc, version).await.unwrap();

        store
            .transition_version(
                created_version.id,
                DocumentStatus::Processing,
                DocumentStatus::Available,
                Some("perm/x/y/z/1"),
            )
            .await
            .unwrap();

        let err = store
            .transition_version(
                created_version.id,
                DocumentStatus::Processing,
                DocumentStatus::Quarantined,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Conflict { .. }));
    }

    #[tokio::test]
    async fn authorize_falls_back_to_folder_ancestry() {
        let store = InMemoryMetadataStore::new();
        let role = RoleId::generate();
        let folder = FolderId::generate();
        let parent = FolderId::generate();
        store.set_folder_parent(folder, parent);
        store.grant(Permission {
            resource_type: ResourceType::Folder,
            resource_id: *parent.as_bytes(),
            role_id: role,
            permission_type: PermissionType::Write,
        });

        let document_id = DocumentId::generate();
        let allowed = store
            .authorize(
                &[role],
                ResourceType::Document,
                *document_id.as_bytes(),
                Some(folder),
                PermissionType::Write,
            )
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn authorize_denies_without_any_matching_permission() {
        let store = InMemoryMetadataStore::new();
        let role = RoleId::generate();
        let document_id = DocumentId::generate();
        let allowed = store
            .authorize(
                &[role],
                ResourceType::Document,
                *document_id.as_bytes(),
                None,
                PermissionType::Read,
            )
            .await
            .unwrap();
        assert!(!allowed);
    }
}
