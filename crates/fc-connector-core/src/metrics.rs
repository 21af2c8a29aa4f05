//! Prometheus-compatible metrics, in the same free-function-per-event
//! style as `fc-router::router_metrics` — counter labels never include
//! latency (latency is a histogram value, never a label), per spec's
//! "closed labeled structs for metric labels" design note.

use metrics::{counter, histogram};

pub fn record_webhook_received(connector: &str, capability_id: &str) {
    counter!(
        "webhook_received_total",
        "connector" => connector.to_string(),
        "capability_id" => capability_id.to_string()
    )
    .increment(1);
}

pub fn record_event_deduped(connector: &str, capability_id: &str) {
    counter!(
        "event_deduped_total",
        "connector" => connector.to_string(),
        "capability_id" => capability_id.to_string()
    )
    .increment(1);
}

pub fn record_event_processed(connector: &str, capability_id: &str) {
    counter!(
        "event_processed_total",
        "connector" => connector.to_string(),
        "capability_id" => capability_id.to_string()
    )
    .increment(1);
}

pub fn record_event_failed(connector: &str, capability_id: &str) {
    counter!(
        "event_failed_total",
        "connector" => connector.to_string(),
        "capability_id" => capability_id.to_string()
    )
    .increment(1);
}

pub fn record_handler_latency_ms(connector: &str, capability_id: &str, latency_ms: u64) {
    histogram!(
        "handler_latency_ms",
        "connector" => connector.to_string(),
        "capability_id" => capability_id.to_string()
    )
    .record(latency_ms as f64);
}

pub fn record_batch_summary(connector: &str, total: u32, processed: u32, deduped: u32, failed: u32) {
    counter!("event_batch_summary", "connector" => connector.to_string(), "field" => "total").increment(total as u64);
    counter!("event_batch_summary", "connector" => connector.to_string(), "field" => "processed").increment(processed as u64);
    counter!("event_batch_summary", "connector" => connector.to_string(), "field" => "deduped").increment(deduped as u64);
    counter!("event_batch_summary", "connector" => connector.to_string(), "field" => "failed").increment(failed as u64);
}

pub fn record_rate_limited(connector: &str) {
    counter!("connector_rate_limited_total", "connector" => connector.to_string()).increment(1);
}

pub fn record_outbound_sent(connector: &str) {
    counter!("outbound_intent_sent_total", "connector" => connector.to_string()).increment(1);
}

pub fn record_outbound_deduped(connector: &str) {
    counter!("outbound_intent_deduped_total", "connector" => connector.to_string()).increment(1);
}

pub fn record_outbound_failed(connector: &str) {
    counter!("outbound_intent_failed_total", "connector" => connector.to_string()).increment(1);
}

pub fn record_outbound_latency_ms(connector: &str, latency_ms: u64) {
    histogram!("outbound_intent_latency_ms", "connector" => connector.to_string()).record(latency_ms as f64);
}
