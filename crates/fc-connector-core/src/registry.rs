//! Capability Registry — maps a capability identifier to its handler.
//!
//! Builder shape mirrors `AuthConfig`'s `basic()`/`oidc()` constructors and
//! `LeaderElectionConfig`'s `with_lock_key`/`with_instance_id` chain: build
//! once at startup, freeze, share via `Arc` for the life of the process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::context::EventContext;

#[derive(Error, Debug)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

/// A capability handler, one method, object-safe — the same one-method
/// trait shape as `fc-router::mediator::Mediator`.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value, ctx: &EventContext) -> Result<(), HandlerError>;
}

/// Immutable after construction: no interior mutability, no runtime
/// registration. A capability id absent from the map is `NO_HANDLER`, not
/// a panic.
pub struct CapabilityRegistry {
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::new()
    }

    pub fn get(&self, capability_id: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(capability_id).cloned()
    }
}

#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, capability_id: impl Into<String>, handler: Arc<dyn CapabilityHandler>) -> Self {
        self.handlers.insert(capability_id.into(), handler);
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl CapabilityHandler for EchoHandler {
        async fn handle(&self, _payload: &serde_json::Value, _ctx: &EventContext) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn registered_capability_is_found() {
        let registry = CapabilityRegistry::builder()
            .with_handler("inbound_messages", Arc::new(EchoHandler))
            .build();

        assert!(registry.get("inbound_messages").is_some());
        assert!(registry.get("missing").is_none());
    }
}
