//! Event-scoped logging context.
//!
//! Context is threaded through `tracing`'s own span machinery rather than
//! an ad hoc logger wrapper (see `fc_common::logging`): a span holds the
//! fields, and any log emitted while the span is entered inherits them.
//! The parent is never mutated — `tracing` spans compose by nesting, not
//! by field merge.

use tracing::{info_span, Span};

/// Read-only values available to a capability handler for one event.
/// Handlers never mutate shared runtime state — this is everything they
/// get.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub correlation_id: String,
    pub connector: String,
    pub tenant_id: Option<String>,
    pub deduped: bool,
    pub dedupe_key: String,
    pub capability_id: String,
}

impl EventContext {
    /// Open the structured-logging span carrying
    /// `{service, connector, correlationId, capabilityId, dedupeKey, tenantId?}`.
    pub fn span(&self, service: &str) -> Span {
        info_span!(
            "connector_event",
            service = %service,
            connector = %self.connector,
            correlation_id = %self.correlation_id,
            capability_id = %self.capability_id,
            dedupe_key = %self.dedupe_key,
            tenant_id = self.tenant_id.as_deref().unwrap_or(""),
        )
    }
}
