//! The production `MetadataStore`: `diesel` + `diesel-async` against Postgres, pooled with
//! `bb8`. Grounded on the one teacher crate backed by a real relational database — the
//! dependency choices (`diesel`, `diesel-async`, `diesel_migrations`, `bb8`) are carried over
//! unchanged.

mod rows;
mod schema;

use std::collections::HashSet;

use bb8::Pool;
use chrono::Utc;
use diesel::prelude::*;
use diesel::OptionalExtension;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use docflow_util::{DocumentId, FolderId, RoleId, TenantId, VersionId};

use crate::error::{MetadataError, MetadataResult};
use crate::models::{
    Document, DocumentMetadataEntry, DocumentStatus, DocumentVersion, Event, EventType, NewDocument,
    NewVersion, Page, Pagination, PermissionType, ResourceType,
};
use crate::store::MetadataStore;
use rows::{
    role_id_bytes, DocumentMetadataRow, DocumentRow, DocumentVersionRow, EventRow, NewDocumentRow,
    NewDocumentVersionRow, NewEventRow,
};
use schema::{document_metadata, document_versions, documents, events, folders, permissions};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct PgMetadataStore {
    pool: Pool<AsyncDieselConnectionManager<AsyncPgConnection>>,
}

impl PgMetadataStore {
    pub async fn connect(database_url: &str, max_size: u32) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder().max_size(max_size).build(manager).await?;
        Ok(Self { pool })
    }

    /// Runs pending migrations. Diesel's migration harness is synchronous, so this spawns a
    /// blocking task holding its own plain connection, the way this tree runs one-off blocking
    /// work alongside an async pool.
    pub fn run_migrations(database_url: &str) -> anyhow::Result<()> {
        let mut conn = diesel::pg::PgConnection::establish(database_url)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    fn backend(err: diesel::result::Error) -> MetadataError {
        MetadataError::Backend(err.into())
    }
}

fn row_to_document(row: DocumentRow) -> MetadataResult<Document> {
    row.try_into()
        .map_err(|e: String| MetadataError::Backend(anyhow::anyhow!(e)))
}

fn row_to_version(row: DocumentVersionRow) -> MetadataResult<DocumentVersion> {
    row.try_into()
        .map_err(|e: String| MetadataError::Backend(anyhow::anyhow!(e)))
}

fn row_to_event(row: EventRow) -> MetadataResult<Event> {
    row.try_into()
        .map_err(|e: String| MetadataError::Backend(anyhow::anyhow!(e)))
}

impl MetadataStore for PgMetadataStore {
    async fn create_document(
        &self,
        document: NewDocument,
        initial_version: NewVersion,
    ) -> MetadataResult<(Document, DocumentVersion)> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let active = folders::table
                    .filter(folders::id.eq(document.folder_id.as_bytes().to_vec()))
                    .filter(folders::tenant_id.eq(document.tenant_id.as_bytes().to_vec()))
                    .filter(folders::deleted_at.is_null())
                    .count()
                    .get_result::<i64>(conn)
                    .await?;
                if active == 0 {
                    return Err(diesel::result::Error::NotFound);
                }

                let new_document = NewDocumentRow::new(
                    document.id,
                    document.tenant_id,
                    document.folder_id,
                    document.owner_id,
                    document.name.clone(),
                    document.content_type.clone(),
                    initial_version.size_bytes,
                );
                let document_row: DocumentRow = diesel::insert_into(documents::table)
                    .values(&new_document)
                    .returning(DocumentRow::as_select())
                    .get_result(conn)
                    .await?;

                let new_version = NewDocumentVersionRow::new(
                    initial_version.id,
                    document.id,
                    1,
                    initial_version.size_bytes,
                    initial_version.content_hash.clone(),
                    initial_version.storage_key.clone(),
                    initial_version.created_by,
                );
                let version_row: DocumentVersionRow = diesel::insert_into(document_versions::table)
                    .values(&new_version)
                    .returning(DocumentVersionRow::as_select())
                    .get_result(conn)
                    .await?;

                Ok((document_row, version_row))
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => MetadataError::Validation(
                "folder does not exist, is not in this tenant, or is soft-deleted".to_string(),
            ),
            diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _) => {
                MetadataError::Conflict {
                    expected: "absent".to_string(),
                    actual: "present".to_string(),
                }
            }
            other => Self::backend(other),
        })
        .and_then(|(d, v)| Ok((row_to_document(d)?, row_to_version(v)?)))
    }

    async fn transition_version(
        &self,
        version_id: VersionId,
        from_status: DocumentStatus,
        to_status: DocumentStatus,
        new_storage_key: Option<&str>,
    ) -> MetadataResult<DocumentVersion> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let version_id_bytes = version_id.as_bytes().to_vec();
        let storage_key = new_storage_key.map(|s| s.to_string());

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let storage_key = storage_key.clone();
            async move {
                let current: Option<DocumentVersionRow> = document_versions::table
                    .filter(document_versions::id.eq(&version_id_bytes))
                    .select(DocumentVersionRow::as_select())
                    .first(conn)
                    .await
                    .optional()?;
                let Some(current) = current else {
                    return Err(diesel::result::Error::NotFound);
                };
                if current.status != from_status.as_str() {
                    return Err(diesel::result::Error::RollbackTransaction);
                }

                let updated: DocumentVersionRow = match storage_key {
                    Some(key) => {
                        diesel::update(document_versions::table)
                            .filter(document_versions::id.eq(&version_id_bytes))
                            .set((
                                document_versions::status.eq(to_status.as_str()),
                                document_versions::storage_key.eq(key),
                            ))
                            .returning(DocumentVersionRow::as_select())
                            .get_result(conn)
                            .await?
                    }
                    None => {
                        diesel::update(document_versions::table)
                            .filter(document_versions::id.eq(&version_id_bytes))
                            .set(document_versions::status.eq(to_status.as_str()))
                            .returning(DocumentVersionRow::as_select())
                            .get_result(conn)
                            .await?
                    }
                };

                diesel::update(documents::table)
                    .filter(documents::id.eq(&updated.document_id))
                    .set((
                        documents::status.eq(to_status.as_str()),
                        documents::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;

                Ok(updated)
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => MetadataError::NotFound,
            diesel::result::Error::RollbackTransaction => MetadataError::Conflict {
                expected: from_status.as_str().to_string(),
                actual: "different status".to_string(),
            },
            other => Self::backend(other),
        })
        .and_then(row_to_version)
    }

    async fn get_document(&self, tenant_id: TenantId, document_id: DocumentId) -> MetadataResult<Document> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let row: DocumentRow = documents::table
            .filter(documents::id.eq(document_id.as_bytes().to_vec()))
            .filter(documents::tenant_id.eq(tenant_id.as_bytes().to_vec()))
            .select(DocumentRow::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => MetadataError::NotFound,
                other => Self::backend(other),
            })?;
        row_to_document(row)
    }

    async fn get_version(&self, tenant_id: TenantId, version_id: VersionId) -> MetadataResult<DocumentVersion> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let row: DocumentVersionRow = document_versions::table
            .inner_join(documents::table.on(documents::id.eq(document_versions::document_id)))
            .filter(document_versions::id.eq(version_id.as_bytes().to_vec()))
            .filter(documents::tenant_id.eq(tenant_id.as_bytes().to_vec()))
            .select(DocumentVersionRow::as_select())
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => MetadataError::NotFound,
                other => Self::backend(other),
            })?;
        row_to_version(row)
    }

    async fn upsert_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        pairs: &[(String, String)],
    ) -> MetadataResult<()> {
        self.get_document(tenant_id, document_id).await?;
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        for (key, value) in pairs {
            diesel::insert_into(document_metadata::table)
                .values((
                    document_metadata::document_id.eq(document_id.as_bytes().to_vec()),
                    document_metadata::key.eq(key),
                    document_metadata::value.eq(value),
                ))
                .on_conflict((document_metadata::document_id, document_metadata::key))
                .do_update()
                .set(document_metadata::value.eq(value))
                .execute(&mut conn)
                .await
                .map_err(Self::backend)?;
        }
        Ok(())
    }

    async fn delete_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        keys: &[String],
    ) -> MetadataResult<()> {
        self.get_document(tenant_id, document_id).await?;
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        diesel::delete(
            document_metadata::table
                .filter(document_metadata::document_id.eq(document_id.as_bytes().to_vec()))
                .filter(document_metadata::key.eq_any(keys)),
        )
        .execute(&mut conn)
        .await
        .map_err(Self::backend)?;
        Ok(())
    }

    async fn list_metadata(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> MetadataResult<Vec<DocumentMetadataEntry>> {
        self.get_document(tenant_id, document_id).await?;
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let rows: Vec<DocumentMetadataRow> = document_metadata::table
            .filter(document_metadata::document_id.eq(document_id.as_bytes().to_vec()))
            .select(DocumentMetadataRow::as_select())
            .load(&mut conn)
            .await
            .map_err(Self::backend)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_folder(
        &self,
        tenant_id: TenantId,
        folder_id: FolderId,
        pagination: Pagination,
    ) -> MetadataResult<Page<Document>> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let mut query = documents::table
            .filter(documents::tenant_id.eq(tenant_id.as_bytes().to_vec()))
            .filter(documents::folder_id.eq(folder_id.as_bytes().to_vec()))
            .into_boxed();
        if let Some((created_at, id)) = pagination.cursor {
            query = query.filter(
                documents::created_at.lt(created_at).or(documents::created_at
                    .eq(created_at)
                    .and(documents::id.lt(id.as_bytes().to_vec()))),
            );
        }
        let rows: Vec<DocumentRow> = query
            .order((documents::created_at.desc(), documents::id.desc()))
            .limit(pagination.limit as i64)
            .select(DocumentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(Self::backend)?;
        let items: Vec<Document> = rows
            .into_iter()
            .map(row_to_document)
            .collect::<MetadataResult<_>>()?;
        let next_cursor = items.last().map(|d| (d.created_at, d.id));
        Ok(Page { items, next_cursor })
    }

    async fn direct_permissions(
        &self,
        resource_type: ResourceType,
        resource_id: [u8; 16],
        role_ids: &[RoleId],
    ) -> MetadataResult<HashSet<PermissionType>> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let resource_type_str = match resource_type {
            ResourceType::Document => "document",
            ResourceType::Folder => "folder",
        };
        let role_bytes: Vec<Vec<u8>> = role_ids.iter().copied().map(role_id_bytes).collect();
        let rows: Vec<String> = permissions::table
            .filter(permissions::resource_type.eq(resource_type_str))
            .filter(permissions::resource_id.eq(resource_id.to_vec()))
            .filter(permissions::role_id.eq_any(role_bytes))
            .select(permissions::permission_type)
            .load(&mut conn)
            .await
            .map_err(Self::backend)?;
        Ok(rows
            .into_iter()
            .filter_map(|s| match s.as_str() {
                "read" => Some(PermissionType::Read),
                "write" => Some(PermissionType::Write),
                "delete" => Some(PermissionType::Delete),
                "admin" => Some(PermissionType::Admin),
                _ => None,
            })
            .collect())
    }

    async fn folder_ancestry(&self, folder_id: FolderId) -> MetadataResult<Vec<FolderId>> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let mut chain = Vec::new();
        let mut current = folder_id.as_bytes().to_vec();
        loop {
            let parent: Option<Vec<u8>> = folders::table
                .filter(folders::id.eq(&current))
                .select(folders::parent_id)
                .first(&mut conn)
                .await
                .optional()
                .map_err(Self::backend)?
                .flatten();
            match parent {
                Some(parent_bytes) => {
                    let id = FolderId::from_bytes(
                        parent_bytes
                            .clone()
                            .try_into()
                            .map_err(|_| MetadataError::Backend(anyhow::anyhow!("corrupt folder id")))?,
                    );
                    chain.push(id);
                    current = parent_bytes;
                }
                None => break,
            }
        }
        Ok(chain)
    }

    async fn folder_is_active(&self, tenant_id: TenantId, folder_id: FolderId) -> MetadataResult<bool> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let deleted_at: Option<chrono::DateTime<Utc>> = folders::table
            .filter(folders::id.eq(folder_id.as_bytes().to_vec()))
            .filter(folders::tenant_id.eq(tenant_id.as_bytes().to_vec()))
            .select(folders::deleted_at)
            .first(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => MetadataError::NotFound,
                other => Self::backend(other),
            })?;
        Ok(deleted_at.is_none())
    }

    async fn record_event(
        &self,
        tenant_id: TenantId,
        event_type: EventType,
        resource_id: [u8; 16],
        payload: serde_json::Value,
    ) -> MetadataResult<Event> {
        let mut conn = self.pool.get().await.map_err(|e| MetadataError::Backend(e.into()))?;
        let new_event = NewEventRow {
            id: docflow_util::EventId::generate().as_bytes().to_vec(),
            tenant_id: tenant_id.as_bytes().to_vec(),
            event_type: event_type.as_str().to_string(),
            resource_id: resource_id.to_vec(),
            payload,
        };
        let row: EventRow = diesel::insert_into(events::table)
            .values(&new_event)
            .returning(EventRow::as_select())
            .get_result(&mut conn)
            .await
            .map_err(Self::backend)?;
        row_to_event(row)
    }
}
