use crate::error::PublishError;
use crate::model::EventEnvelope;

/// Fire-and-forget, at-least-once hand-off to an external bus. Delivery retries and subscriber
/// fan-out are the sink's responsibility; the core only guarantees it attempted to publish after
/// the durable state change and logs (never propagates) a failure to its caller.
#[allow(async_fn_in_trait)]
pub trait EventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError>;
}

/// Publishes by POSTing the envelope as JSON to a configured webhook URL, matching the
/// teacher's own `reqwest`-based HTTP client usage for control-plane-to-node calls.
pub struct WebhookPublisher {
    client: reqwest::Client,
    sink_url: String,
}

impl WebhookPublisher {
    pub fn new(sink_url: impl Into<String>, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            client,
            sink_url: sink_url.into(),
        })
    }
}

impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.sink_url)
            .json(&event)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.into()))?;
        if !response.status().is_success() {
            return Err(PublishError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Records every published envelope in memory instead of making a network call. Used by
/// orchestrator tests to assert on emitted events without standing up an HTTP sink.
#[derive(Default)]
pub struct RecordingPublisher {
    events: tokio::sync::Mutex<Vec<EventEnvelope>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<EventEnvelope> {
        self.events.lock().await.clone()
    }
}

impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_util::id::TenantId;

    #[tokio::test]
    async fn recording_publisher_retains_published_events_in_order() {
        let publisher = RecordingPublisher::new();
        let tenant = TenantId::generate();
        for i in 0..3 {
            let event = EventEnvelope::new(
                tenant,
                crate::model::EventType::DocumentUploaded,
                format!("doc-{i}"),
                serde_json::json!({}),
            );
            publisher.publish(event).await.unwrap();
        }
        let recorded = publisher.recorded().await;
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[1].resource_id, "doc-1");
    }
}
