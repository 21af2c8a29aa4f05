//! External collaborator: sends one outbound intent through a platform
//! provider API. One async method, object-safe — the same shape as
//! `fc-router::mediator::Mediator`. Retries are this trait's own
//! responsibility: the core never retries a send.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::OutboundIntent;

#[derive(Error, Debug)]
#[error("send failed: {0}")]
pub struct SendError(pub String);

/// Successful send outcome, carrying whatever the provider exposed back.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    pub upstream_status: Option<u16>,
}

#[async_trait]
pub trait ProviderSender: Send + Sync {
    async fn send(&self, intent: &OutboundIntent) -> Result<SendOutcome, SendError>;
}
