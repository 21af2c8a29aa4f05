//! Demo capability handlers. A real connector would translate the payload
//! into a domain action (store a message, update delivery status, notify a
//! subscriber); these just prove the registry/dispatch wiring with a
//! structured log line.

use async_trait::async_trait;
use fc_connector_core::registry::{CapabilityHandler, HandlerError};
use fc_connector_core::EventContext;
use tracing::info;

pub struct InboundMessageHandler;

#[async_trait]
impl CapabilityHandler for InboundMessageHandler {
    async fn handle(&self, payload: &serde_json::Value, ctx: &EventContext) -> Result<(), HandlerError> {
        info!(
            message_id = payload.get("messageId").and_then(|v| v.as_str()).unwrap_or(""),
            message_type = payload.get("messageType").and_then(|v| v.as_str()).unwrap_or(""),
            capability = %ctx.capability_id,
            "Would persist and route inbound message"
        );
        Ok(())
    }
}

pub struct MessageStatusHandler;

#[async_trait]
impl CapabilityHandler for MessageStatusHandler {
    async fn handle(&self, payload: &serde_json::Value, ctx: &EventContext) -> Result<(), HandlerError> {
        info!(
            message_id = payload.get("messageId").and_then(|v| v.as_str()).unwrap_or(""),
            status = payload.get("status").and_then(|v| v.as_str()).unwrap_or(""),
            capability = %ctx.capability_id,
            "Would update delivery status"
        );
        Ok(())
    }
}
