//! The `ScanQueue` trait: an at-least-once durable work queue with visibility leases,
//! exponential-backoff nacks and dead-lettering (§4.3).

use std::time::Duration;

use docflow_util::TaskId;

use crate::error::ScanQueueResult;
use crate::model::{NewScanTask, ScanTask};

#[allow(async_fn_in_trait)]
pub trait ScanQueue: Send + Sync + 'static {
    async fn send(&self, task: NewScanTask) -> ScanQueueResult<TaskId>;

    /// Marks up to `max` visible tasks invisible for `lease`, and returns them. A second
    /// `receive` before the lease expires or the task is acked will not re-deliver it.
    async fn receive(&self, max: u32, lease: Duration) -> ScanQueueResult<Vec<ScanTask>>;

    /// Ack: removes the task. Deleting an already-absent task is not an error (idempotent).
    async fn delete(&self, task_id: TaskId) -> ScanQueueResult<()>;

    /// Nack: makes the task visible again at `now + delay`, incrementing its attempt counter.
    /// Once the post-increment attempt count exceeds [`docflow_util::time::MAX_SCAN_ATTEMPTS`],
    /// the task is dead-lettered instead of being made visible again.
    async fn nack(&self, task_id: TaskId, delay: Duration) -> ScanQueueResult<()>;

    /// Current count of visible (not leased, not dead-lettered) tasks, for the queue-depth gauge.
    async fn visible_depth(&self) -> ScanQueueResult<u64>;
}
