//! Shared primitives used across the connector workspace: structured logging
//! setup and PII-safe logging helpers. Domain types (parsed events, batch
//! summaries, outbound intents, ...) live in `fc-connector-core` — this crate
//! only holds the ambient concerns every crate in the workspace needs.

pub mod logging;
pub mod masking;

use uuid::Uuid;

/// Generate a fresh correlation id.
///
/// Used whenever an inbound request carries no `x-correlation-id` header, and
/// always for GET webhook-verification requests (the platform never sends one
/// during the handshake).
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
