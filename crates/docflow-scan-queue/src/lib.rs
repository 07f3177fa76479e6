//! A durable work queue for scan tasks: at-least-once delivery, visibility leases,
//! exponential-backoff nacks, and dead-lettering after 5 attempts (§4.3).

mod error;
mod memory;
mod model;
pub mod postgres;
mod queue;

pub use error::{ScanQueueError, ScanQueueResult};
pub use memory::InMemoryScanQueue;
pub use model::{NewScanTask, ScanTask};
pub use postgres::PgScanQueue;
pub use queue::ScanQueue;
