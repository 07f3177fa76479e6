//! Event publisher (C9): fire-and-forget, at-least-once domain-event fan-out to external
//! subscribers. The core never blocks on delivery and never retries beyond the sink's own
//! request — publish failures are logged by the caller, not propagated as orchestrator errors.

mod error;
mod model;
mod publisher;

pub use error::PublishError;
pub use model::{EventEnvelope, EventType};
pub use publisher::{EventPublisher, RecordingPublisher, WebhookPublisher};
