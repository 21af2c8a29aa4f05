//! Example WhatsApp connector: wires the runtime core against a minimal
//! WhatsApp-shaped parser, a pair of demo capability handlers, and a Graph
//! API sender with retries, the way `bin/fc-router/src/main.rs` wires
//! `fc-router`'s library against SQS and an HTTP mediator. Real connectors
//! replace `parser`, `handlers`, and `provider` with their own platform
//! integration; everything else is reusable as-is.

mod handlers;
mod parser;
mod provider;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use fc_config::{ConnectorConfig, Environment};
use fc_connector_core::model::{CapabilityDescriptor, CapabilityStatus, ConnectorManifest};
use fc_connector_core::registry::CapabilityRegistry;
use fc_connector_core::{InboundPipeline, OutboundBatchProcessor};
use fc_connector_dedupe::{DedupeStore, InMemoryDedupeStore, RedisDedupeStore};
use fc_connector_http::ConnectorState;
use fc_connector_ratelimit::KeyedRateLimiter;
use fc_connector_signature::{SignatureVerifier, WebhookVerifier};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use handlers::{InboundMessageHandler, MessageStatusHandler};
use parser::{WhatsAppEventParser, CAPABILITY_INBOUND_MESSAGES, CAPABILITY_MESSAGE_STATUS_UPDATES};
use provider::{GraphApiSender, GraphSenderConfig};

const CONNECTOR_ID: &str = "whatsapp";
const SERVICE_NAME: &str = "fc-whatsapp-connector";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    fc_common::logging::init_logging(SERVICE_NAME);

    let config = ConnectorConfig::load("WHATSAPP").context("failed to load connector configuration")?;
    info!(environment = ?config.environment, port = config.http.port, "Starting WhatsApp connector");

    let redis_store = connect_redis_store(&config).await?.map(Arc::new);
    let outbound_dedupe_store = build_outbound_dedupe_store(redis_store.clone())?;
    let inbound_dedupe_store = build_inbound_dedupe_store(&config, redis_store)?;
    let dedupe_ttl = Duration::from_millis(config.dedupe.ttl_ms);

    let manifest = Arc::new(manifest());

    let signature_verifier = SignatureVerifier::new(config.webhook_secret.clone());
    if !signature_verifier.is_enabled() {
        warn!("WHATSAPP_WEBHOOK_SECRET not set: signature validation skipped");
    }
    let webhook_verifier = config.verify_token.clone().map(WebhookVerifier::new);

    let rate_limiter = Arc::new(KeyedRateLimiter::new(config.rate_limit.per_minute));

    let registry = Arc::new(
        CapabilityRegistry::builder()
            .with_handler(CAPABILITY_INBOUND_MESSAGES, Arc::new(InboundMessageHandler))
            .with_handler(CAPABILITY_MESSAGE_STATUS_UPDATES, Arc::new(MessageStatusHandler))
            .build(),
    );

    let inbound = Arc::new(InboundPipeline::new(
        SERVICE_NAME,
        manifest.clone(),
        signature_verifier,
        webhook_verifier,
        inbound_dedupe_store,
        dedupe_ttl,
        rate_limiter,
        registry,
        Some(Arc::new(WhatsAppEventParser)),
    ));

    let provider_sender = Arc::new(GraphApiSender::new(GraphSenderConfig {
        access_token: std::env::var("WHATSAPP_ACCESS_TOKEN").unwrap_or_default(),
        ..GraphSenderConfig::default()
    }));
    let outbound = Arc::new(OutboundBatchProcessor::new(
        SERVICE_NAME,
        CONNECTOR_ID,
        outbound_dedupe_store,
        dedupe_ttl,
        provider_sender,
    ));

    let state = ConnectorState {
        inbound,
        outbound,
        connector_id: CONNECTOR_ID.to_string(),
        environment: config.environment,
        staging_outbound_token: config.staging_outbound_token.clone(),
    };

    let app = fc_connector_http::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "WhatsApp connector listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("WhatsApp connector shutdown complete");
    Ok(())
}

/// Connects and boot-pings the distributed dedupe store if `REDIS_URL` is
/// configured. Returns `None` when it isn't; callers decide whether that's
/// acceptable for their side of the pipeline.
async fn connect_redis_store(config: &ConnectorConfig) -> Result<Option<RedisDedupeStore>> {
    let Some(redis_url) = &config.dedupe.redis_url else {
        return Ok(None);
    };

    let ping_timeout = Duration::from_millis(config.dedupe.boot_ping_timeout_ms);
    let store = RedisDedupeStore::connect(redis_url, config.dedupe.key_prefix.clone())
        .await
        .context("failed to connect to dedupe store")?;
    store.ping(ping_timeout).await.context("dedupe store boot-time ping failed")?;
    info!("Connected to distributed dedupe store");
    Ok(Some(store))
}

/// Outbound dedupe always requires the distributed store, in every
/// environment including development: a duplicate outbound delivery is
/// worse than refusing to start.
fn build_outbound_dedupe_store(redis_store: Option<Arc<RedisDedupeStore>>) -> Result<Arc<dyn DedupeStore>> {
    redis_store.map(|s| s as Arc<dyn DedupeStore>).ok_or_else(|| {
        anyhow::anyhow!(
            "REDIS_URL is required: the outbound dedupe store is never allowed to fall back \
             to in-memory, even in development"
        )
    })
}

/// `staging` and `production` require a reachable distributed dedupe store
/// or the process aborts startup; only `development` may fall back to the
/// in-memory store, with a loud warning.
fn build_inbound_dedupe_store(
    config: &ConnectorConfig,
    redis_store: Option<Arc<RedisDedupeStore>>,
) -> Result<Arc<dyn DedupeStore>> {
    match redis_store {
        Some(store) => Ok(store as Arc<dyn DedupeStore>),
        None if config.environment.requires_reachable_dedupe() => {
            bail!(
                "REDIS_URL is required in {:?}: a distributed dedupe store is mandatory outside development",
                config.environment
            );
        }
        None => {
            warn!("No REDIS_URL configured: falling back to in-memory dedupe store for inbound only (development only, not safe for scale-out)");
            Ok(Arc::new(InMemoryDedupeStore::new()) as Arc<dyn DedupeStore>)
        }
    }
}

fn manifest() -> ConnectorManifest {
    ConnectorManifest {
        id: CONNECTOR_ID.to_string(),
        name: "WhatsApp".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: "meta".to_string(),
        capabilities: vec![
            CapabilityDescriptor { id: CAPABILITY_INBOUND_MESSAGES.to_string(), status: CapabilityStatus::Active },
            CapabilityDescriptor { id: CAPABILITY_MESSAGE_STATUS_UPDATES.to_string(), status: CapabilityStatus::Active },
        ],
        webhook_path: "/webhook".to_string(),
        health_path: "/health".to_string(),
        required_env_vars: vec!["WHATSAPP_VERIFY_TOKEN".to_string(), "WHATSAPP_ACCESS_TOKEN".to_string()],
        optional_env_vars: vec!["WHATSAPP_WEBHOOK_SECRET".to_string(), "REDIS_URL".to_string()],
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
