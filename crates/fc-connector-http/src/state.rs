//! `ConnectorState` — the `Arc`-wrapped bundle of collaborators an axum
//! handler needs. Mirrors `fc-router::api::AppState`'s role as the single
//! `State` extractor value shared across all routes.

use std::sync::Arc;

use fc_config::Environment;
use fc_connector_core::{InboundPipeline, OutboundBatchProcessor};

/// Everything a connector's HTTP routes need, constructed once at startup.
#[derive(Clone)]
pub struct ConnectorState {
    pub inbound: Arc<InboundPipeline>,
    pub outbound: Arc<OutboundBatchProcessor>,
    pub connector_id: String,
    pub environment: Environment,
    /// Absent disables the staging outbound endpoint entirely, independent
    /// of `environment`.
    pub staging_outbound_token: Option<String>,
}
