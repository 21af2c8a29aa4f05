//! Boundary and domain types shared across the inbound pipeline and the
//! outbound batch processor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming HTTP request, reduced to what the pipeline needs. Header names
/// are lowercased by the adapter before this is built (mirrors the
/// "lowercase header names" requirement so lookups here never retry casings).
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    pub headers: HashMap<String, Vec<String>>,
    pub query: HashMap<String, String>,
    /// Parsed JSON body, when present. `None` for GET requests.
    pub body: Option<serde_json::Value>,
    /// Exact bytes received, required whenever signature verification is
    /// enabled. Its absence with signatures enabled is a configuration
    /// error (500), not a client error (401).
    pub raw_body: Option<Vec<u8>>,
}

impl RuntimeRequest {
    /// First value of a (lowercase) header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.first()).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
}

/// Outgoing HTTP response, reduced to what the adapter needs to render.
#[derive(Debug, Clone)]
pub struct RuntimeResponse {
    pub status: u16,
    pub content_type: ContentType,
    pub body: serde_json::Value,
    pub headers: HashMap<String, String>,
}

/// One atomic unit of an inbound webhook batch, produced by the external
/// event parser. Dedupe keys here are never built from PII: the discipline
/// lives entirely with the parser (see `fc_connector_core::parser::EventParser`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub capability_id: String,
    pub dedupe_key: String,
    pub correlation_id: Option<String>,
    pub tenant_id: Option<String>,
    pub payload: serde_json::Value,
}

/// Aggregate outcome counts for one inbound batch or one outbound batch.
/// `total == processed + deduped + failed` always holds for a non-empty
/// batch (inbound) or `total == sent + deduped + failed` (outbound).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: u32,
    pub processed: u32,
    pub deduped: u32,
    pub failed: u32,
}

impl BatchSummary {
    pub fn is_fully_deduped(&self) -> bool {
        self.total > 0 && self.deduped == self.total && self.processed == 0 && self.failed == 0
    }
}

/// Outcome codes an inbound batch item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemErrorCode {
    NoHandler,
    HandlerFailed,
}

/// Per-event outcome within an inbound batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub capability_id: String,
    pub dedupe_key: String,
    pub ok: bool,
    pub deduped: bool,
    pub correlation_id: Option<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ItemErrorCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    Active,
    Planned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub id: String,
    pub status: CapabilityStatus,
}

/// Static metadata describing a connector's identity and declared
/// capabilities. The runtime reads only `id` (logging defaults) and
/// `capabilities`; the rest is informational for admin surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub platform: String,
    pub capabilities: Vec<CapabilityDescriptor>,
    pub webhook_path: String,
    pub health_path: String,
    pub required_env_vars: Vec<String>,
    pub optional_env_vars: Vec<String>,
}

impl ConnectorManifest {
    pub fn capability_status(&self, id: &str) -> Option<CapabilityStatus> {
        self.capabilities
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.status)
    }
}

/// Discriminated outbound payload union. Kept intentionally small — the
/// core only needs enough shape to pass the payload through to the
/// provider sender untouched; it never inspects the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPayload {
    Text { body: String },
    MediaById { media_id: String },
    MediaByUrl { url: String },
    Template { name: String, params: serde_json::Value },
    Reaction { message_id: String, emoji: String },
    MarkRead { message_id: String },
}

/// A request to send one outbound message. `intent_id` doubles as the
/// idempotency key presented to the provider (e.g. as `client_msg_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundIntent {
    pub intent_id: String,
    pub tenant_id: String,
    pub provider: String,
    /// Opaque recipient identifier. MUST be masked before it reaches any
    /// log line — see `fc_common::masking::mask_recipient`.
    pub recipient: String,
    pub payload: OutboundPayload,
    /// Deliberately excludes `recipient` so PII never enters persisted
    /// dedupe state.
    pub dedupe_key: String,
    pub correlation_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundStatus {
    Sent,
    Deduped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundErrorCode {
    DedupeErrorBlocked,
    DedupeErrorAllowed,
    SendFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundItemResult {
    pub intent_id: String,
    pub status: OutboundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<OutboundErrorCode>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundBatchSummary {
    pub total: u32,
    pub sent: u32,
    pub deduped: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_deduped_requires_nonzero_total_and_zero_other_outcomes() {
        let empty = BatchSummary::default();
        assert!(!empty.is_fully_deduped());

        let all_duped = BatchSummary { total: 3, processed: 0, deduped: 3, failed: 0 };
        assert!(all_duped.is_fully_deduped());

        let mixed = BatchSummary { total: 3, processed: 1, deduped: 2, failed: 0 };
        assert!(!mixed.is_fully_deduped());
    }

    #[test]
    fn manifest_capability_lookup_is_derived_not_stored() {
        let manifest = ConnectorManifest {
            id: "whatsapp".to_string(),
            name: "WhatsApp".to_string(),
            version: "0.1.0".to_string(),
            platform: "meta".to_string(),
            capabilities: vec![CapabilityDescriptor {
                id: "inbound_messages".to_string(),
                status: CapabilityStatus::Active,
            }],
            webhook_path: "/webhook".to_string(),
            health_path: "/health".to_string(),
            required_env_vars: vec![],
            optional_env_vars: vec![],
        };

        assert_eq!(manifest.capability_status("inbound_messages"), Some(CapabilityStatus::Active));
        assert_eq!(manifest.capability_status("missing"), None);
    }
}
