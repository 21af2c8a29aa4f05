//! Connector runtime core: the correctness-critical center every
//! per-platform connector shares — parsed-event and outbound-intent types,
//! the capability registry, the inbound pipeline (`handleGet`/`handlePost`),
//! and the outbound batch processor. Everything platform-specific (payload
//! grammars, the provider HTTP client) stays outside this crate as a
//! collaborator trait implementation.

pub mod context;
pub mod error;
pub mod inbound;
pub mod metrics;
pub mod model;
pub mod outbound;
pub mod parser;
pub mod provider;
pub mod registry;

pub use context::EventContext;
pub use error::ConnectorError;
pub use inbound::{GetOutcome, InboundPipeline, PostOutcome, PostResponseBody};
pub use outbound::{OutboundBatchProcessor, OutboundBatchResponse};
pub use parser::{EventParser, ParseError};
pub use provider::{ProviderSender, SendError, SendOutcome};
pub use registry::{CapabilityHandler, CapabilityRegistry, CapabilityRegistryBuilder, HandlerError};
