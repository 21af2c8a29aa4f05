//! Demo Graph API sender with retries and a circuit breaker.
//!
//! Retry and breaker policy lives entirely at the provider boundary, never
//! in the core pipeline. Grounded in `fc-router::mediator::HttpMediator`'s
//! `CircuitBreaker` (`failure_threshold`/`reset_timeout`, atomic counters,
//! `RwLock<CircuitState>`) and its retry loop (fixed backoff schedule,
//! capped attempts, no retry on a configuration-shaped error).

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fc_connector_core::model::{OutboundIntent, OutboundPayload};
use fc_connector_core::provider::{ProviderSender, SendError, SendOutcome};
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Trips after `failure_threshold` consecutive failures; a single success
/// while half-open closes it again. Same shape as `HttpMediator`'s breaker,
/// scaled down (one breaker per sender instance, not per downstream host,
/// since this demo only ever talks to one Graph API base URL).
struct CircuitBreaker {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    last_failure: RwLock<Option<Instant>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: RwLock::new(None),
            failure_threshold,
            reset_timeout,
        }
    }

    fn allow_request(&self) -> bool {
        let state = *self.state.read();
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if let Some(last) = *self.last_failure.read() {
                    if last.elapsed() >= self.reset_timeout {
                        *self.state.write() = CircuitState::HalfOpen;
                        return true;
                    }
                }
                false
            }
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        *self.state.write() = CircuitState::Closed;
    }

    fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.failure_threshold {
            *self.state.write() = CircuitState::Open;
            *self.last_failure.write() = Some(Instant::now());
            warn!(failures = count, "Graph API circuit breaker opened");
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphSenderConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delays: Vec<Duration>,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reset: Duration,
}

impl Default for GraphSenderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com/v19.0".to_string(),
            access_token: String::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_delays: vec![Duration::from_millis(200), Duration::from_millis(500), Duration::from_secs(1)],
            circuit_breaker_threshold: 5,
            circuit_breaker_reset: Duration::from_secs(30),
        }
    }
}

pub struct GraphApiSender {
    client: Client,
    config: GraphSenderConfig,
    circuit_breaker: CircuitBreaker,
}

impl GraphApiSender {
    pub fn new(config: GraphSenderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client builds with a plain timeout");
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker_threshold, config.circuit_breaker_reset);

        Self { client, config, circuit_breaker }
    }

    fn payload_json(intent: &OutboundIntent) -> serde_json::Value {
        let type_fields = match &intent.payload {
            OutboundPayload::Text { body } => json!({"type": "text", "text": {"body": body}}),
            OutboundPayload::MediaById { media_id } => json!({"type": "image", "image": {"id": media_id}}),
            OutboundPayload::MediaByUrl { url } => json!({"type": "image", "image": {"link": url}}),
            OutboundPayload::Template { name, params } => {
                json!({"type": "template", "template": {"name": name, "components": params}})
            }
            OutboundPayload::Reaction { message_id, emoji } => {
                json!({"type": "reaction", "reaction": {"message_id": message_id, "emoji": emoji}})
            }
            OutboundPayload::MarkRead { message_id } => {
                json!({"status": "read", "message_id": message_id})
            }
        };

        let mut body = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": intent.recipient,
            // Doubles as the provider-side idempotency key.
            "client_msg_id": intent.intent_id,
        });
        if let serde_json::Value::Object(ref mut map) = body {
            if let serde_json::Value::Object(fields) = type_fields {
                map.extend(fields);
            }
        }
        body
    }

    /// One request attempt. `retryable` distinguishes a transient upstream
    /// failure (5xx, network error) from a configuration-shaped one (4xx)
    /// that retrying can never fix.
    async fn send_once(&self, intent: &OutboundIntent) -> Result<SendOutcome, (SendError, bool)> {
        let url = format!("{}/messages", self.config.base_url);
        let body = Self::payload_json(intent);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| (SendError(format!("request failed: {e}")), true))?;

        let status = response.status();
        if status.is_success() {
            Ok(SendOutcome { upstream_status: Some(status.as_u16()) })
        } else if status.is_client_error() {
            // 4xx is a configuration problem at the provider, not transient.
            Err((SendError(format!("Graph API rejected send: HTTP {status}")), false))
        } else {
            Err((SendError(format!("Graph API transient error: HTTP {status}")), true))
        }
    }
}

#[async_trait]
impl ProviderSender for GraphApiSender {
    async fn send(&self, intent: &OutboundIntent) -> Result<SendOutcome, SendError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SendError("circuit breaker open".to_string()));
        }

        let mut attempt = 0;
        loop {
            match self.send_once(intent).await {
                Ok(outcome) => {
                    self.circuit_breaker.record_success();
                    return Ok(outcome);
                }
                Err((e, retryable)) => {
                    self.circuit_breaker.record_failure();
                    attempt += 1;
                    if !retryable || attempt >= self.config.max_attempts {
                        return Err(e);
                    }
                    let delay = self
                        .config
                        .retry_delays
                        .get(attempt as usize - 1)
                        .copied()
                        .unwrap_or(Duration::from_secs(1));
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %fc_common::masking::sanitize_error_message(&e.to_string()),
                        "Retrying outbound send"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_includes_client_msg_id_for_provider_side_idempotency() {
        let intent = OutboundIntent {
            intent_id: "intent-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            provider: "whatsapp".to_string(),
            recipient: "+15551234567".to_string(),
            payload: OutboundPayload::Text { body: "hello".to_string() },
            dedupe_key: "whatsapp:tenant:tenant-1:intent:intent-1".to_string(),
            correlation_id: None,
            created_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };

        let body = GraphApiSender::payload_json(&intent);
        assert_eq!(body["client_msg_id"], "intent-1");
        assert_eq!(body["text"]["body"], "hello");
        assert_eq!(body["to"], "+15551234567");
    }

    #[test]
    fn circuit_breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(!breaker.allow_request());
    }

    #[test]
    fn circuit_breaker_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
        breaker.record_failure();
        assert!(!breaker.allow_request());
        // Force half-open by pretending the reset timeout elapsed, then succeed.
        *breaker.last_failure.write() = Some(Instant::now() - Duration::from_secs(31));
        assert!(breaker.allow_request());
        breaker.record_success();
        assert!(breaker.allow_request());
    }

    fn test_intent(id: &str) -> OutboundIntent {
        OutboundIntent {
            intent_id: id.to_string(),
            tenant_id: "tenant-1".to_string(),
            provider: "whatsapp".to_string(),
            recipient: "+15551234567".to_string(),
            payload: OutboundPayload::Text { body: "hi".to_string() },
            dedupe_key: format!("whatsapp:tenant:tenant-1:intent:{id}"),
            correlation_id: None,
            created_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    fn test_sender(base_url: String, max_attempts: u32) -> GraphApiSender {
        GraphApiSender::new(GraphSenderConfig {
            base_url,
            access_token: "token".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts,
            retry_delays: vec![Duration::from_millis(1), Duration::from_millis(1)],
            circuit_breaker_threshold: 10,
            circuit_breaker_reset: Duration::from_secs(30),
        })
    }

    #[tokio::test]
    async fn non_retryable_4xx_response_is_sent_exactly_once() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let sender = test_sender(server.uri(), 3);
        let result = sender.send(&test_intent("intent-4xx")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn transient_5xx_response_is_retried_up_to_max_attempts() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let sender = test_sender(server.uri(), 3);
        let result = sender.send(&test_intent("intent-5xx")).await;
        assert!(result.is_err());
    }
}
