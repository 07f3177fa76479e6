//! Postgres-backed scan queue: a `scan_tasks` table with `SELECT ... FOR UPDATE SKIP LOCKED`
//! for the visibility lease, sharing the connection pool the metadata store uses (§4.3).
//! Grounded on `pageserver`'s deletion queue split between a fast accumulator and durable
//! storage: here the durable storage is the whole story, since ordering doesn't matter and
//! the CAS on version status (§4.7) already makes duplicate delivery safe.

mod schema;

use std::time::Duration;

use bb8::Pool;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Binary, Integer, Text, Timestamptz};
use diesel::OptionalExtension;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use docflow_util::time::MAX_SCAN_ATTEMPTS;
use docflow_util::{DocumentId, TaskId, TenantId, VersionId};

use crate::error::{ScanQueueError, ScanQueueResult};
use crate::model::{NewScanTask, ScanTask};
use crate::queue::ScanQueue;
use schema::{scan_tasks, scan_tasks_dead_letter};

#[derive(QueryableByName)]
struct ScanTaskRow {
    #[diesel(sql_type = Binary)]
    task_id: Vec<u8>,
    #[diesel(sql_type = Binary)]
    tenant_id: Vec<u8>,
    #[diesel(sql_type = Binary)]
    document_id: Vec<u8>,
    #[diesel(sql_type = Binary)]
    version_id: Vec<u8>,
    #[diesel(sql_type = Text)]
    storage_key: String,
    #[diesel(sql_type = Integer)]
    attempt: i32,
    #[diesel(sql_type = Timestamptz)]
    enqueued_at: chrono::DateTime<Utc>,
}

fn parse_id16(bytes: &[u8]) -> [u8; 16] {
    bytes.try_into().expect("id column must be 16 bytes")
}

impl From<ScanTaskRow> for ScanTask {
    fn from(row: ScanTaskRow) -> Self {
        ScanTask {
            task_id: TaskId::from_bytes(parse_id16(&row.task_id)),
            tenant_id: TenantId::from_bytes(parse_id16(&row.tenant_id)),
            document_id: DocumentId::from_bytes(parse_id16(&row.document_id)),
            version_id: VersionId::from_bytes(parse_id16(&row.version_id)),
            storage_key: row.storage_key,
            attempt: row.attempt as u32,
            enqueued_at: row.enqueued_at,
        }
    }
}

pub struct PgScanQueue {
    pool: Pool<AsyncDieselConnectionManager<AsyncPgConnection>>,
}

impl PgScanQueue {
    /// Takes a pool directly so callers can share it with the metadata store's pool.
    pub fn new(pool: Pool<AsyncDieselConnectionManager<AsyncPgConnection>>) -> Self {
        Self { pool }
    }

    fn backend(err: impl std::error::Error + Send + Sync + 'static) -> ScanQueueError {
        ScanQueueError::Backend(err.into())
    }
}

impl ScanQueue for PgScanQueue {
    async fn send(&self, task: NewScanTask) -> ScanQueueResult<TaskId> {
        let mut conn = self.pool.get().await.map_err(Self::backend)?;
        let task_id = TaskId::generate();
        diesel::insert_into(scan_tasks::table)
            .values((
                scan_tasks::task_id.eq(task_id.as_bytes().to_vec()),
                scan_tasks::tenant_id.eq(task.tenant_id.as_bytes().to_vec()),
                scan_tasks::document_id.eq(task.document_id.as_bytes().to_vec()),
                scan_tasks::version_id.eq(task.version_id.as_bytes().to_vec()),
                scan_tasks::storage_key.eq(&task.storage_key),
                scan_tasks::attempt.eq(1),
            ))
            .execute(&mut conn)
            .await
            .map_err(Self::backend)?;
        Ok(task_id)
    }

    async fn receive(&self, max: u32, lease: Duration) -> ScanQueueResult<Vec<ScanTask>> {
        let mut conn = self.pool.get().await.map_err(Self::backend)?;
        let lease_secs = lease.as_secs() as i64;
        let rows: Vec<ScanTaskRow> = diesel::sql_query(
            "update scan_tasks set visible_at = now() + make_interval(secs => $1) \
             where task_id in ( \
                 select task_id from scan_tasks \
                 where visible_at <= now() \
                 order by visible_at \
                 limit $2 \
                 for update skip locked \
             ) \
             returning task_id, tenant_id, document_id, version_id, storage_key, attempt, enqueued_at",
        )
        .bind::<BigInt, _>(lease_secs)
        .bind::<BigInt, _>(max as i64)
        .load(&mut conn)
        .await
        .map_err(Self::backend)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, task_id: TaskId) -> ScanQueueResult<()> {
        let mut conn = self.pool.get().await.map_err(Self::backend)?;
        diesel::delete(scan_tasks::table.filter(scan_tasks::task_id.eq(task_id.as_bytes().to_vec())))
            .execute(&mut conn)
            .await
            .map_err(Self::backend)?;
        Ok(())
    }

    async fn nack(&self, task_id: TaskId, delay: Duration) -> ScanQueueResult<()> {
        let mut conn = self.pool.get().await.map_err(Self::backend)?;
        let row: Option<(Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, String, i32, chrono::DateTime<Utc>)> =
            scan_tasks::table
                .filter(scan_tasks::task_id.eq(task_id.as_bytes().to_vec()))
                .select((
                    scan_tasks::task_id,
                    scan_tasks::tenant_id,
                    scan_tasks::document_id,
                    scan_tasks::version_id,
                    scan_tasks::storage_key,
                    scan_tasks::attempt,
                    scan_tasks::enqueued_at,
                ))
                .first(&mut conn)
                .await
                .optional()
                .map_err(Self::backend)?;
        let Some((id, tenant_id, document_id, version_id, storage_key, attempt, enqueued_at)) = row
        else {
            return Ok(());
        };

        if attempt as u32 >= MAX_SCAN_ATTEMPTS {
            diesel::insert_into(scan_tasks_dead_letter::table)
                .values((
                    scan_tasks_dead_letter::task_id.eq(&id),
                    scan_tasks_dead_letter::tenant_id.eq(tenant_id),
                    scan_tasks_dead_letter::document_id.eq(document_id),
                    scan_tasks_dead_letter::version_id.eq(version_id),
                    scan_tasks_dead_letter::storage_key.eq(storage_key),
                    scan_tasks_dead_letter::attempt.eq(attempt),
                    scan_tasks_dead_letter::enqueued_at.eq(enqueued_at),
                ))
                .execute(&mut conn)
                .await
                .map_err(Self::backend)?;
            diesel::delete(scan_tasks::table.filter(scan_tasks::task_id.eq(&id)))
                .execute(&mut conn)
                .await
                .map_err(Self::backend)?;
            return Ok(());
        }

        let delay_secs = delay.as_secs() as i64;
        diesel::sql_query(
            "update scan_tasks set attempt = attempt + 1, visible_at = now() + make_interval(secs => $1) where task_id = $2",
        )
        .bind::<BigInt, _>(delay_secs)
        .bind::<Binary, _>(id)
        .execute(&mut conn)
        .await
        .map_err(Self::backend)?;
        Ok(())
    }

    async fn visible_depth(&self) -> ScanQueueResult<u64> {
        let mut conn = self.pool.get().await.map_err(Self::backend)?;
        let count: i64 = scan_tasks::table
            .filter(scan_tasks::visible_at.le(Utc::now()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(Self::backend)?;
        Ok(count as u64)
    }
}
