//! Inbound pipeline: `handleGet` (webhook subscription handshake) and
//! `handlePost` (the validated, signature-checked, deduplicated batch
//! pipeline). Constructed once at connector startup and held behind `Arc`,
//! mirroring how `QueueManager` is built once and shared via `Arc` across
//! axum handlers in `fc-router::api::AppState`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fc_common::new_correlation_id;
use fc_connector_dedupe::{DedupeFailMode, DedupeStore};
use fc_connector_ratelimit::KeyedRateLimiter;
use fc_connector_signature::{SignatureVerifier, WebhookVerifier};
use tracing::{info, warn, Instrument};

use crate::context::EventContext;
use crate::error::ConnectorError;
use crate::metrics;
use crate::model::{
    BatchItemResult, BatchSummary, ConnectorManifest, ItemErrorCode, ParsedEvent, RuntimeRequest,
};
use crate::parser::EventParser;
use crate::registry::CapabilityRegistry;

/// Successful validated-batch response body.
#[derive(Debug, Clone)]
pub struct PostResponseBody {
    pub ok: bool,
    pub fully_deduped: bool,
    pub summary: BatchSummary,
    pub results: Vec<BatchItemResult>,
}

/// `handleGet` outcome: always carries a fresh correlation id, even on
/// rejection, since the platform never sends one during the handshake.
pub struct GetOutcome {
    pub correlation_id: String,
    pub result: Result<String, ConnectorError>,
}

/// `handlePost` outcome: carries the correlation id that must appear both
/// in the `x-correlation-id` response header and the body, per the
/// correlation-propagation invariant — even on an error path.
pub struct PostOutcome {
    pub correlation_id: String,
    pub result: Result<PostResponseBody, ConnectorError>,
}

pub struct InboundPipeline {
    service_name: String,
    connector_id: String,
    signature_verifier: SignatureVerifier,
    webhook_verifier: Option<WebhookVerifier>,
    dedupe_store: Arc<dyn DedupeStore>,
    dedupe_ttl: Duration,
    /// Default `closed`: a dedupe-check failure proceeds as "not duplicate"
    /// since the upstream platform will redeliver on a dropped 200.
    dedupe_fail_mode: DedupeFailMode,
    rate_limiter: Arc<KeyedRateLimiter>,
    registry: Arc<CapabilityRegistry>,
    parser: Option<Arc<dyn EventParser>>,
    manifest: Arc<ConnectorManifest>,
}

impl InboundPipeline {
    pub fn new(
        service_name: impl Into<String>,
        manifest: Arc<ConnectorManifest>,
        signature_verifier: SignatureVerifier,
        webhook_verifier: Option<WebhookVerifier>,
        dedupe_store: Arc<dyn DedupeStore>,
        dedupe_ttl: Duration,
        rate_limiter: Arc<KeyedRateLimiter>,
        registry: Arc<CapabilityRegistry>,
        parser: Option<Arc<dyn EventParser>>,
    ) -> Self {
        let connector_id = manifest.id.clone();
        Self {
            service_name: service_name.into(),
            connector_id,
            signature_verifier,
            webhook_verifier,
            dedupe_store,
            dedupe_ttl,
            dedupe_fail_mode: DedupeFailMode::Closed,
            rate_limiter,
            registry,
            parser,
            manifest,
        }
    }

    /// Override the default fail-closed dedupe policy. Inbound almost never
    /// needs this; exposed for parity with the outbound processor's
    /// constructor and for tests exercising the fail-open path.
    pub fn with_dedupe_fail_mode(mut self, mode: DedupeFailMode) -> Self {
        self.dedupe_fail_mode = mode;
        self
    }

    /// GET `/webhook`: the platform subscription handshake.
    pub async fn handle_get(&self, query: &HashMap<String, String>) -> GetOutcome {
        let correlation_id = new_correlation_id();

        let Some(verifier) = &self.webhook_verifier else {
            return GetOutcome {
                correlation_id,
                result: Err(ConnectorError::ServiceUnavailable(
                    "verify token not configured".to_string(),
                )),
            };
        };

        let outcome = verifier.verify(
            query.get("hub.mode").map(|s| s.as_str()),
            query.get("hub.verify_token").map(|s| s.as_str()),
            query.get("hub.challenge").map(|s| s.as_str()),
        );

        let result = match outcome {
            fc_connector_signature::HandshakeOutcome::Confirmed { challenge } => Ok(challenge),
            fc_connector_signature::HandshakeOutcome::Rejected { .. } => {
                Err(ConnectorError::Forbidden("verify token mismatch".to_string()))
            }
        };

        GetOutcome { correlation_id, result }
    }

    /// POST `/webhook`: the validated, deduplicated, dispatched batch
    /// pipeline. Ordering here is load-bearing.
    pub async fn handle_post(&self, request: RuntimeRequest) -> PostOutcome {
        // (1) Resolve fallback correlation id.
        let correlation_id = request
            .header("x-correlation-id")
            .map(|s| s.to_string())
            .unwrap_or_else(new_correlation_id);

        match self.handle_post_inner(&request, &correlation_id).await {
            Ok(body) => PostOutcome { correlation_id, result: Ok(body) },
            Err(err) => PostOutcome { correlation_id, result: Err(err) },
        }
    }

    async fn handle_post_inner(
        &self,
        request: &RuntimeRequest,
        fallback_correlation_id: &str,
    ) -> Result<PostResponseBody, ConnectorError> {
        // (2) Signature enabled but no raw body captured: misconfiguration.
        if self.signature_verifier.is_enabled() && request.raw_body.is_none() {
            return Err(ConnectorError::Internal("raw body unavailable for signature check".to_string()));
        }

        // (3) Verify signature once.
        let signature_outcome = self
            .signature_verifier
            .verify(request.raw_body.as_deref(), request.header("x-hub-signature-256"));
        if !signature_outcome.valid {
            return Err(ConnectorError::Unauthorized("Invalid signature".to_string()));
        }

        // (4) Parse the batch.
        let Some(parser) = &self.parser else {
            return Err(ConnectorError::Internal("no event parser configured".to_string()));
        };
        let batch = parser
            .parse(request)
            .await
            .map_err(|e| ConnectorError::WebhookValidationFailed(e.0))?;
        if batch.is_empty() {
            return Err(ConnectorError::WebhookValidationFailed("empty batch".to_string()));
        }

        // (5) Elect batch correlation id.
        let correlation_id = batch[0]
            .correlation_id
            .clone()
            .unwrap_or_else(|| fallback_correlation_id.to_string());

        // (6) Rate limit, cost = batch size.
        if let Some(first) = batch.first() {
            let rate_key = first.tenant_id.clone().unwrap_or_else(|| self.manifest.id.clone());
            let decision = self.rate_limiter.consume(&rate_key, batch.len() as u32);
            if !decision.allowed {
                let retry_after_secs = decision
                    .retry_after
                    .map(|d| (d.as_millis().div_ceil(1000) as u64).max(1))
                    .unwrap_or(60);
                metrics::record_rate_limited(&self.connector_id);
                return Err(ConnectorError::RateLimitExceeded { retry_after_secs });
            }
        }

        // (7) Sequential per-event processing.
        let mut results = Vec::with_capacity(batch.len());
        let mut summary = BatchSummary { total: batch.len() as u32, ..Default::default() };

        for event in &batch {
            let item = self.process_event(event, &correlation_id).await;
            match (item.deduped, item.ok) {
                (true, _) => summary.deduped += 1,
                (false, true) => summary.processed += 1,
                (false, false) => summary.failed += 1,
            }
            results.push(item);
        }

        // (8) Batch-summary log line + metric.
        info!(
            connector = %self.connector_id,
            correlation_id = %correlation_id,
            total = summary.total,
            processed = summary.processed,
            deduped = summary.deduped,
            failed = summary.failed,
            "Event batch summary"
        );
        metrics::record_batch_summary(&self.connector_id, summary.total, summary.processed, summary.deduped, summary.failed);

        Ok(PostResponseBody {
            ok: true,
            fully_deduped: summary.is_fully_deduped(),
            summary,
            results,
        })
    }

    async fn process_event(&self, event: &ParsedEvent, batch_correlation_id: &str) -> BatchItemResult {
        let correlation_id = event
            .correlation_id
            .clone()
            .unwrap_or_else(|| batch_correlation_id.to_string());

        let ctx = EventContext {
            correlation_id: correlation_id.clone(),
            connector: self.connector_id.clone(),
            tenant_id: event.tenant_id.clone(),
            deduped: false,
            dedupe_key: event.dedupe_key.clone(),
            capability_id: event.capability_id.clone(),
        };
        let span = ctx.span(&self.service_name);

        async {
            metrics::record_webhook_received(&self.connector_id, &event.capability_id);
            let started = Instant::now();

            let is_duplicate = match self.dedupe_store.check_and_mark(&event.dedupe_key, self.dedupe_ttl).await {
                Ok(dup) => dup,
                Err(e) => {
                    // Inbound dedupe failures are fail-closed per the runtime's
                    // default policy: the upstream platform will redeliver.
                    warn!(error = %fc_common::masking::sanitize_error_message(&e.to_string()), "Dedupe check failed, proceeding (fail-closed)");
                    false
                }
            };

            if is_duplicate {
                metrics::record_event_deduped(&self.connector_id, &event.capability_id);
                let latency_ms = started.elapsed().as_millis() as u64;
                metrics::record_handler_latency_ms(&self.connector_id, &event.capability_id, latency_ms);
                info!("Duplicate event skipped");
                return BatchItemResult {
                    capability_id: event.capability_id.clone(),
                    dedupe_key: event.dedupe_key.clone(),
                    ok: true,
                    deduped: true,
                    correlation_id: Some(correlation_id),
                    latency_ms,
                    error_code: None,
                };
            }

            let Some(handler) = self.registry.get(&event.capability_id) else {
                warn!("No handler registered for capability");
                let latency_ms = started.elapsed().as_millis() as u64;
                metrics::record_handler_latency_ms(&self.connector_id, &event.capability_id, latency_ms);
                return BatchItemResult {
                    capability_id: event.capability_id.clone(),
                    dedupe_key: event.dedupe_key.clone(),
                    ok: false,
                    deduped: false,
                    correlation_id: Some(correlation_id),
                    latency_ms,
                    error_code: Some(ItemErrorCode::NoHandler),
                };
            };

            let outcome = handler.handle(&event.payload, &ctx).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            metrics::record_handler_latency_ms(&self.connector_id, &event.capability_id, latency_ms);

            match outcome {
                Ok(()) => {
                    metrics::record_event_processed(&self.connector_id, &event.capability_id);
                    info!("Event processed successfully");
                    BatchItemResult {
                        capability_id: event.capability_id.clone(),
                        dedupe_key: event.dedupe_key.clone(),
                        ok: true,
                        deduped: false,
                        correlation_id: Some(correlation_id),
                        latency_ms,
                        error_code: None,
                    }
                }
                Err(e) => {
                    metrics::record_event_failed(&self.connector_id, &event.capability_id);
                    warn!(error = %fc_common::masking::sanitize_error_message(&e.to_string()), "Handler execution failed");
                    BatchItemResult {
                        capability_id: event.capability_id.clone(),
                        dedupe_key: event.dedupe_key.clone(),
                        ok: false,
                        deduped: false,
                        correlation_id: Some(correlation_id),
                        latency_ms,
                        error_code: Some(ItemErrorCode::HandlerFailed),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
