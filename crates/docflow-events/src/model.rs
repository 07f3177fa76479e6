use chrono::{DateTime, Utc};
use docflow_util::id::{EventId, TenantId};
use serde::{Deserialize, Serialize};

/// Domain event kinds emitted by the pipeline. `as_str` gives the wire name used in the
/// envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    DocumentUploaded,
    DocumentProcessed,
    DocumentQuarantined,
    DocumentDownloaded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::DocumentUploaded => "document.uploaded",
            EventType::DocumentProcessed => "document.processed",
            EventType::DocumentQuarantined => "document.quarantined",
            EventType::DocumentDownloaded => "document.downloaded",
        }
    }
}

/// The wire envelope handed to subscribers. `resource_id` is whatever opaque id the event is
/// about, rendered as hex text since subscribers outside the core have no reason to know about
/// our newtypes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub resource_id: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(
        tenant_id: TenantId,
        event_type: EventType,
        resource_id: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::generate(),
            tenant_id,
            event_type: event_type.as_str().to_string(),
            resource_id: resource_id.into(),
            data,
            created_at: Utc::now(),
        }
    }
}
