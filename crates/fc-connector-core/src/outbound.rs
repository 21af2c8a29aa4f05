//! Outbound Batch Processor: the dual of the inbound pipeline. Dedupe
//! happens *before* the provider side effect for each intent, sequentially,
//! so a replayed batch never calls `ProviderSender::send` twice for the
//! same dedupe key. Constructed once at startup and held behind `Arc`, the
//! same lifecycle as `InboundPipeline`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fc_common::masking::mask_recipient;
use fc_connector_dedupe::{DedupeFailMode, DedupeStore};
use tracing::{info, info_span, warn, Instrument};

use crate::metrics;
use crate::model::{
    OutboundBatchSummary, OutboundErrorCode, OutboundIntent, OutboundItemResult, OutboundStatus,
};
use crate::provider::ProviderSender;

/// Response body for one outbound batch submission: a summary plus
/// per-intent results, in the same order as the input slice.
#[derive(Debug, Clone)]
pub struct OutboundBatchResponse {
    pub summary: OutboundBatchSummary,
    pub results: Vec<OutboundItemResult>,
}

pub struct OutboundBatchProcessor {
    service_name: String,
    connector_id: String,
    dedupe_store: Arc<dyn DedupeStore>,
    dedupe_ttl: Duration,
    /// Default `open`: a dedupe-check failure blocks the send, since a
    /// duplicate outbound delivery is worse than a dropped one.
    dedupe_fail_mode: DedupeFailMode,
    provider_sender: Arc<dyn ProviderSender>,
}

impl OutboundBatchProcessor {
    pub fn new(
        service_name: impl Into<String>,
        connector_id: impl Into<String>,
        dedupe_store: Arc<dyn DedupeStore>,
        dedupe_ttl: Duration,
        provider_sender: Arc<dyn ProviderSender>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            connector_id: connector_id.into(),
            dedupe_store,
            dedupe_ttl,
            dedupe_fail_mode: DedupeFailMode::Open,
            provider_sender,
        }
    }

    /// Override the default fail-open dedupe policy. Exposed for
    /// environments that would rather risk a duplicate send than drop one
    /// (mirrors `InboundPipeline::with_dedupe_fail_mode`'s symmetric knob).
    pub fn with_dedupe_fail_mode(mut self, mode: DedupeFailMode) -> Self {
        self.dedupe_fail_mode = mode;
        self
    }

    /// Process a batch of outbound intents, sequentially and in order.
    pub async fn process_batch(&self, intents: &[OutboundIntent]) -> OutboundBatchResponse {
        let mut summary = OutboundBatchSummary { total: intents.len() as u32, ..Default::default() };
        let mut results = Vec::with_capacity(intents.len());

        for intent in intents {
            let item = self.process_intent(intent).await;
            match item.status {
                OutboundStatus::Sent => summary.sent += 1,
                OutboundStatus::Deduped => summary.deduped += 1,
                OutboundStatus::Failed => summary.failed += 1,
            }
            results.push(item);
        }

        info!(
            connector = %self.connector_id,
            total = summary.total,
            sent = summary.sent,
            deduped = summary.deduped,
            failed = summary.failed,
            "Outbound batch summary"
        );

        OutboundBatchResponse { summary, results }
    }

    async fn process_intent(&self, intent: &OutboundIntent) -> OutboundItemResult {
        let masked_recipient = mask_recipient(&intent.recipient);
        let span = info_span!(
            "outbound_intent",
            service = %self.service_name,
            connector = %self.connector_id,
            correlation_id = intent.correlation_id.as_deref().unwrap_or(""),
            tenant_id = %intent.tenant_id,
            intent_id = %intent.intent_id,
            recipient = %masked_recipient,
        );

        async {
            let started = Instant::now();

            let dedupe_outcome = self
                .dedupe_store
                .check_and_mark(&intent.dedupe_key, self.dedupe_ttl)
                .await;

            match dedupe_outcome {
                Err(e) => self.handle_dedupe_error(intent, &e, started).await,
                Ok(true) => {
                    metrics::record_outbound_deduped(&self.connector_id);
                    let latency_ms = started.elapsed().as_millis() as u64;
                    metrics::record_outbound_latency_ms(&self.connector_id, latency_ms);
                    info!("Duplicate intent skipped");
                    OutboundItemResult {
                        intent_id: intent.intent_id.clone(),
                        status: OutboundStatus::Deduped,
                        error_code: None,
                        latency_ms,
                        upstream_status: None,
                    }
                }
                Ok(false) => self.send_and_record(intent, started, None).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Route a dedupe-store operational failure per `dedupe_fail_mode`:
    /// `open` blocks the send and reports it as deduped with
    /// `dedupe_error_blocked`; `closed` proceeds to send and, on success,
    /// attaches `dedupe_error_allowed` so the result is visibly not backed
    /// by a trustworthy dedupe check.
    async fn handle_dedupe_error(
        &self,
        intent: &OutboundIntent,
        error: &fc_connector_dedupe::DedupeError,
        started: Instant,
    ) -> OutboundItemResult {
        warn!(error = %fc_common::masking::sanitize_error_message(&error.to_string()), fail_mode = ?self.dedupe_fail_mode, "Dedupe check failed for outbound intent");

        match self.dedupe_fail_mode {
            DedupeFailMode::Open => {
                metrics::record_outbound_deduped(&self.connector_id);
                let latency_ms = started.elapsed().as_millis() as u64;
                metrics::record_outbound_latency_ms(&self.connector_id, latency_ms);
                OutboundItemResult {
                    intent_id: intent.intent_id.clone(),
                    status: OutboundStatus::Deduped,
                    error_code: Some(OutboundErrorCode::DedupeErrorBlocked),
                    latency_ms,
                    upstream_status: None,
                }
            }
            DedupeFailMode::Closed => {
                self.send_and_record(intent, started, Some(OutboundErrorCode::DedupeErrorAllowed)).await
            }
        }
    }

    async fn send_and_record(
        &self,
        intent: &OutboundIntent,
        started: Instant,
        success_error_code: Option<OutboundErrorCode>,
    ) -> OutboundItemResult {
        let outcome = self.provider_sender.send(intent).await;
        let latency_ms = started.elapsed().as_millis() as u64;
        metrics::record_outbound_latency_ms(&self.connector_id, latency_ms);

        match outcome {
            Ok(send_outcome) => {
                metrics::record_outbound_sent(&self.connector_id);
                info!(
                    recipient = %mask_recipient(&intent.recipient),
                    "Intent sent"
                );
                OutboundItemResult {
                    intent_id: intent.intent_id.clone(),
                    status: OutboundStatus::Sent,
                    error_code: success_error_code,
                    latency_ms,
                    upstream_status: send_outcome.upstream_status,
                }
            }
            Err(e) => {
                metrics::record_outbound_failed(&self.connector_id);
                warn!(error = %fc_common::masking::sanitize_error_message(&e.to_string()), "Intent send failed");
                OutboundItemResult {
                    intent_id: intent.intent_id.clone(),
                    status: OutboundStatus::Failed,
                    error_code: Some(OutboundErrorCode::SendFailed),
                    latency_ms,
                    upstream_status: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutboundPayload;
    use crate::provider::SendError;
    use async_trait::async_trait;
    use fc_connector_dedupe::InMemoryDedupeStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn intent(id: &str, dedupe_key: &str) -> OutboundIntent {
        OutboundIntent {
            intent_id: id.to_string(),
            tenant_id: "tenant-stg-ig".to_string(),
            provider: "instagram".to_string(),
            recipient: "+15551234567".to_string(),
            payload: OutboundPayload::Text { body: "hi".to_string() },
            dedupe_key: dedupe_key.to_string(),
            correlation_id: None,
            created_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    struct CountingSender {
        calls: AtomicUsize,
    }

    impl CountingSender {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderSender for CountingSender {
        async fn send(&self, _intent: &OutboundIntent) -> Result<crate::provider::SendOutcome, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(crate::provider::SendOutcome { upstream_status: Some(200) })
        }
    }

    struct AlwaysFailSender;

    #[async_trait]
    impl ProviderSender for AlwaysFailSender {
        async fn send(&self, _intent: &OutboundIntent) -> Result<crate::provider::SendOutcome, SendError> {
            Err(SendError("provider unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn replayed_intent_is_sent_at_most_once() {
        let sender = Arc::new(CountingSender::new());
        let processor = OutboundBatchProcessor::new(
            "test",
            "instagram",
            Arc::new(InMemoryDedupeStore::new()),
            Duration::from_secs(60),
            sender.clone(),
        );

        let one = intent("550e8400-e29b-41d4-a716-446655440000", "instagram:tenant:tenant-stg-ig:intent:550e8400");
        let first = processor.process_batch(&[one.clone()]).await;
        assert_eq!(first.summary, OutboundBatchSummary { total: 1, sent: 1, deduped: 0, failed: 0 });

        let second = processor.process_batch(&[one]).await;
        assert_eq!(second.summary, OutboundBatchSummary { total: 1, sent: 0, deduped: 1, failed: 0 });

        assert_eq!(sender.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_send_is_classified_failed_with_error_code() {
        let processor = OutboundBatchProcessor::new(
            "test",
            "instagram",
            Arc::new(InMemoryDedupeStore::new()),
            Duration::from_secs(60),
            Arc::new(AlwaysFailSender),
        );

        let response = processor.process_batch(&[intent("i1", "k1")]).await;
        assert_eq!(response.summary, OutboundBatchSummary { total: 1, sent: 0, deduped: 0, failed: 1 });
        assert_eq!(response.results[0].error_code, Some(OutboundErrorCode::SendFailed));
    }

    #[tokio::test]
    async fn batch_results_preserve_input_order() {
        let sender = Arc::new(CountingSender::new());
        let processor = OutboundBatchProcessor::new(
            "test",
            "instagram",
            Arc::new(InMemoryDedupeStore::new()),
            Duration::from_secs(60),
            sender,
        );

        let batch = vec![intent("a", "key-a"), intent("b", "key-b"), intent("c", "key-c")];
        let response = processor.process_batch(&batch).await;
        let ids: Vec<&str> = response.results.iter().map(|r| r.intent_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
