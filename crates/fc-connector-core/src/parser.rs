//! External collaborator: turns a raw inbound request into a batch of
//! typed parsed events. The core never models platform payload grammars —
//! it only consumes this trait's output.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ParsedEvent, RuntimeRequest};

#[derive(Error, Debug)]
#[error("parse failed: {0}")]
pub struct ParseError(pub String);

#[async_trait]
pub trait EventParser: Send + Sync {
    async fn parse(&self, request: &RuntimeRequest) -> Result<Vec<ParsedEvent>, ParseError>;
}
