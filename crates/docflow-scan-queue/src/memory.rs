//! An in-memory scan queue, a `Mutex`-guarded map ordered by `visible_at` on each `receive`.
//! Analogous to `pageserver`'s deletion queue favoring in-process channel plumbing for tests
//! over a live backing store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docflow_util::time::MAX_SCAN_ATTEMPTS;
use docflow_util::TaskId;

use crate::error::ScanQueueResult;
use crate::model::{NewScanTask, ScanTask};
use crate::queue::ScanQueue;

struct Record {
    task: ScanTask,
    visible_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, Record>,
    dead_letter: HashSet<TaskId>,
}

#[derive(Default)]
pub struct InMemoryScanQueue {
    state: Mutex<State>,
}

impl InMemoryScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead_lettered(&self) -> Vec<TaskId> {
        self.state.lock().unwrap().dead_letter.iter().copied().collect()
    }
}

impl ScanQueue for InMemoryScanQueue {
    async fn send(&self, task: NewScanTask) -> ScanQueueResult<TaskId> {
        let task_id = TaskId::generate();
        let now = docflow_util::time::now();
        let record = Record {
            task: ScanTask {
                task_id,
                tenant_id: task.tenant_id,
                document_id: task.document_id,
                version_id: task.version_id,
                storage_key: task.storage_key,
                attempt: 1,
                enqueued_at: now,
            },
            visible_at: now,
        };
        self.state.lock().unwrap().tasks.insert(task_id, record);
        Ok(task_id)
    }

    async fn receive(&self, max: u32, lease: Duration) -> ScanQueueResult<Vec<ScanTask>> {
        let mut state = self.state.lock().unwrap();
        let now = docflow_util::time::now();
        let mut candidates: Vec<TaskId> = state
            .tasks
            .iter()
            .filter(|(_, r)| r.visible_at <= now)
            .map(|(id, _)| *id)
            .collect();
        candidates.sort_by_key(|id| state.tasks[id].visible_at);
        candidates.truncate(max as usize);

        let lease_until = now
            + chrono::Duration::from_std(lease).map_err(|e| {
                crate::error::ScanQueueError::Backend(anyhow::anyhow!(e))
            })?;
        let mut out = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(record) = state.tasks.get_mut(&id) {
                record.visible_at = lease_until;
                out.push(record.task.clone());
            }
        }
        Ok(out)
    }

    async fn delete(&self, task_id: TaskId) -> ScanQueueResult<()> {
        self.state.lock().unwrap().tasks.remove(&task_id);
        Ok(())
    }

    async fn nack(&self, task_id: TaskId, delay: Duration) -> ScanQueueResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(record) = state.tasks.get_mut(&task_id) else {
            return Ok(());
        };
        if record.task.attempt >= MAX_SCAN_ATTEMPTS {
            state.tasks.remove(&task_id);
            state.dead_letter.insert(task_id);
            return Ok(());
        }
        record.task.attempt += 1;
        record.visible_at = docflow_util::time::now()
            + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        Ok(())
    }

    async fn visible_depth(&self) -> ScanQueueResult<u64> {
        let state = self.state.lock().unwrap();
        let now = docflow_util::time::now();
        Ok(state.tasks.values().filter(|r| r.visible_at <= now).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_util::{DocumentId, TenantId, VersionId};

    fn task() -> NewScanTask {
        NewScanTask {
            tenant_id: TenantId::generate(),
            document_id: DocumentId::generate(),
            version_id: VersionId::generate(),
            storage_key: "temp/x/y/1".to_string(),
        }
    }

    #[tokio::test]
    async fn receive_hides_task_until_lease_expires() {
        let queue = InMemoryScanQueue::new();
        queue.send(task()).await.unwrap();

        let first = queue.receive(10, Duration::from_secs(900)).await.unwrap();
        assert_eq!(first.len(), 1);

        let second = queue.receive(10, Duration::from_secs(900)).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let queue = InMemoryScanQueue::new();
        let id = TaskId::generate();
        queue.delete(id).await.unwrap();
        queue.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn nack_five_times_dead_letters() {
        let queue = InMemoryScanQueue::new();
        queue.send(task()).await.unwrap();
        let received = queue.receive(1, Duration::from_secs(900)).await.unwrap();
        let id = received[0].task_id;

        for _ in 0..MAX_SCAN_ATTEMPTS {
            queue.nack(id, Duration::from_millis(0)).await.unwrap();
        }

        assert!(queue.dead_lettered().contains(&id));
        let redelivered = queue.receive(10, Duration::from_secs(900)).await.unwrap();
        assert!(redelivered.is_empty());
    }
}
