//! HTTP surface: `GET /health`, `GET /webhook`, `POST /webhook`,
//! `POST /__staging/outbound`. Pure request plumbing — every handler here
//! converts an axum request into the core's boundary types, delegates, and
//! renders the result. No business logic lives in this module.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fc_common::new_correlation_id;
use fc_config::Environment;
use fc_connector_core::model::{BatchItemResult, BatchSummary, OutboundBatchSummary, OutboundItemResult, OutboundIntent, RuntimeRequest};
use fc_connector_core::ConnectorError;

use crate::state::ConnectorState;

pub fn router(state: ConnectorState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook", get(webhook_get_handler).post(webhook_post_handler))
        .route("/__staging/outbound", post(staging_outbound_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connector: String,
}

async fn health_handler(State(state): State<ConnectorState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", connector: state.connector_id.clone() })
}

/// `GET /webhook`: platform subscription handshake. Always generates a
/// fresh correlation id — the platform sends none during the handshake.
async fn webhook_get_handler(
    State(state): State<ConnectorState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let outcome = state.inbound.handle_get(&query).await;

    match outcome.result {
        Ok(challenge) => {
            let mut response = (StatusCode::OK, challenge).into_response();
            response
                .headers_mut()
                .insert("content-type", "text/plain".parse().expect("static content-type is valid"));
            insert_correlation_header(&mut response, &outcome.correlation_id);
            response
        }
        Err(err) => err.into_response_with_correlation(&outcome.correlation_id),
    }
}

#[derive(Debug, Serialize)]
struct PostSuccessBody {
    ok: bool,
    #[serde(rename = "fullyDeduped")]
    fully_deduped: bool,
    summary: BatchSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    results: Vec<BatchItemResult>,
    #[serde(rename = "correlationId")]
    correlation_id: String,
}

/// `POST /webhook`: the validated, deduplicated, dispatched batch pipeline.
///
/// `Bytes` is extracted directly rather than `Json<...>` so the signature
/// verifier sees the exact bytes the platform sent, before any
/// deserialization touches them — the axum equivalent of the
/// raw-body-capture middleware other stacks need a dedicated layer for.
async fn webhook_post_handler(State(state): State<ConnectorState>, headers: HeaderMap, body: Bytes) -> Response {
    let request = build_runtime_request(&headers, HashMap::new(), &body);
    let outcome = state.inbound.handle_post(request).await;

    match outcome.result {
        Ok(body) => {
            let response_body = PostSuccessBody {
                ok: body.ok,
                fully_deduped: body.fully_deduped,
                summary: body.summary,
                results: body.results,
                correlation_id: outcome.correlation_id.clone(),
            };
            let mut response = (StatusCode::OK, Json(response_body)).into_response();
            insert_correlation_header(&mut response, &outcome.correlation_id);
            response
        }
        Err(err) => err.into_response_with_correlation(&outcome.correlation_id),
    }
}

#[derive(Debug, Deserialize)]
struct StagingOutboundRequest {
    intents: Vec<OutboundIntent>,
}

#[derive(Debug, Serialize)]
struct StagingOutboundResponse {
    ok: bool,
    summary: OutboundBatchSummary,
    results: Vec<OutboundItemResult>,
    #[serde(rename = "correlationId")]
    correlation_id: String,
}

/// `POST /__staging/outbound`: staging-only debug endpoint for exercising
/// the outbound batch processor directly, gated by `x-staging-token`. 404s
/// outside staging so it never becomes a reachable surface in production.
async fn staging_outbound_handler(State(state): State<ConnectorState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = new_correlation_id();

    if state.environment == Environment::Production {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(configured_token) = &state.staging_outbound_token else {
        return ConnectorError::ServiceUnavailable("staging outbound token not configured".to_string())
            .into_response_with_correlation(&correlation_id);
    };

    let presented = headers.get("x-staging-token").and_then(|v| v.to_str().ok());
    if presented != Some(configured_token.as_str()) {
        return ConnectorError::Forbidden("staging token mismatch".to_string())
            .into_response_with_correlation(&correlation_id);
    }

    let request: StagingOutboundRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "Failed to parse staging outbound request body");
            return ConnectorError::WebhookValidationFailed("invalid request body".to_string())
                .into_response_with_correlation(&correlation_id);
        }
    };

    let outcome = state.outbound.process_batch(&request.intents).await;
    let response_body = StagingOutboundResponse {
        ok: true,
        summary: outcome.summary,
        results: outcome.results,
        correlation_id: correlation_id.clone(),
    };
    let mut response = (StatusCode::OK, Json(response_body)).into_response();
    insert_correlation_header(&mut response, &correlation_id);
    response
}

fn build_runtime_request(headers: &HeaderMap, query: HashMap<String, String>, raw_body: &Bytes) -> RuntimeRequest {
    let mut header_map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            header_map.entry(name.as_str().to_string()).or_default().push(value.to_string());
        }
    }

    let body = serde_json::from_slice(raw_body).ok();

    RuntimeRequest {
        headers: header_map,
        query,
        body,
        raw_body: Some(raw_body.to_vec()),
    }
}

fn insert_correlation_header(response: &mut Response, correlation_id: &str) {
    if let Ok(value) = correlation_id.parse() {
        response.headers_mut().insert("x-correlation-id", value);
    }
}
