//! The `MetadataStore` trait: transactional, tenant-scoped CRUD over documents, versions,
//! metadata, permissions and events (§4.2). Every query predicate is expected to include
//! `tenant_id`; a row belonging to a different tenant must come back as [`MetadataError::NotFound`],
//! never a forbidden/conflict variant, so that existence can't leak across tenants.

use docflow_util::{DocumentId, FolderId, RoleId, TenantId, VersionId};

use crate::error::MetadataResult;
use crate::models::{
    Document, DocumentMetadataEntry, DocumentStatus, DocumentVersion, Event, EventType, NewDocument,
    NewVersion, Page, Pagination, PermissionType, ResourceType,
};

#[allow(async_fn_in_trait)]
pub trait MetadataStore: Send + Sync + 'static {
    /// Atomic in one transaction: inserts the document row (`status=processing`) and its first
    /// version row (`status=processing`).
    async fn create_document(
        &self,
        document: NewDocument,
        initial_version: NewVersion,
    ) -> MetadataResult<(Document, DocumentVersion)>;

    /// Compare-and-set on `status`. Returns [`crate::MetadataError::Conflict`] if `from_status`
    /// no longer holds — the linearization point for the scan worker's outcome state machine.
    async fn transition_version(
        &self,
        version_id: VersionId,
        from_status: DocumentStatus,
        to_status: DocumentStatus,
        new_storage_key: Option<&str>,
    ) -> MetadataResult<DocumentVersion>;

    async fn get_document(&self, tenant_id: TenantId, document_id: DocumentId) -> MetadataResult<Document>;

    async fn get_version(&self, tenant_id: TenantId, version_id: VersionId) -> MetadataResult<DocumentVersion>;

    async fn upsert_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        pairs: &[(String, String)],
    ) -> MetadataResult<()>;

    async fn delete_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        keys: &[String],
    ) -> MetadataResult<()>;

    async fn list_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> MetadataResult<Vec<DocumentMetadataEntry>>;

    /// Deterministic ordering by `(created_at desc, id desc)` (§4.2).
    async fn list_by_folder(
        &self,
        tenant_id: TenantId,
        folder_id: FolderId,
        pagination: Pagination,
    ) -> MetadataResult<Page<Document>>;

    async fn direct_permissions(
        &self,
        resource_type: ResourceType,
        resource_id: [u8; 16],
        role_ids: &[RoleId],
    ) -> MetadataResult<std::collections::HashSet<PermissionType>>;

    async fn folder_ancestry(&self, folder_id: FolderId) -> MetadataResult<Vec<FolderId>>;

    /// Folder existence/soft-delete check backing invariant I7.
    async fn folder_is_active(&self, tenant_id: TenantId, folder_id: FolderId) -> MetadataResult<bool>;

    async fn record_event(
        &self,
        tenant_id: TenantId,
        event_type: EventType,
        resource_id: [u8; 16],
        payload: serde_json::Value,
    ) -> MetadataResult<Event>;

    /// Evaluates §6.5: direct permissions first, then folder ancestry child-to-root. Tenant
    /// scoping is carried by the opaque resource/folder ids and the caller's role set, both of
    /// which are already tenant-bound by construction.
    async fn authorize(
        &self,
        roles: &[RoleId],
        resource_type: ResourceType,
        resource_id: [u8; 16],
        folder_id: Option<FolderId>,
        action: PermissionType,
    ) -> MetadataResult<bool> {
        let direct = self
            .direct_permissions(resource_type, resource_id, roles)
            .await?;
        if direct.contains(&action) {
            return Ok(true);
        }
        let Some(folder_id) = folder_id else {
            return Ok(false);
        };
        let mut chain = vec![folder_id];
        chain.extend(self.folder_ancestry(folder_id).await?);
        for folder in chain {
            let perms = self
                .direct_permissions(ResourceType::Folder, *folder.as_bytes(), roles)
                .await?;
            if perms.contains(&action) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
