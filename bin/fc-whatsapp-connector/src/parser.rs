//! Minimal WhatsApp Cloud API webhook parser.
//!
//! Demonstrates the `EventParser` contract against a realistic (trimmed)
//! slice of the Meta WhatsApp webhook envelope — `entry[].changes[].value`
//! carrying `metadata.phone_number_id` plus `messages[]`/`statuses[]`. The
//! core never sees this shape; it only consumes the `ParsedEvent`s this
//! module produces. Dedupe keys follow the connector-wide grammar:
//! `whatsapp:<phone_number_id>:msg:<id>` and
//! `whatsapp:<phone_number_id>:status:<id>:<status>`.

use async_trait::async_trait;
use fc_connector_core::model::{ParsedEvent, RuntimeRequest};
use fc_connector_core::parser::{EventParser, ParseError};
use serde::Deserialize;

pub const CAPABILITY_INBOUND_MESSAGES: &str = "inbound_messages";
pub const CAPABILITY_MESSAGE_STATUS_UPDATES: &str = "message_status_updates";

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    value: ChangeValue,
}

#[derive(Debug, Deserialize)]
struct ChangeValue {
    metadata: Metadata,
    #[serde(default)]
    messages: Vec<WhatsAppMessage>,
    #[serde(default)]
    statuses: Vec<WhatsAppStatus>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WhatsAppMessage {
    id: String,
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WhatsAppStatus {
    id: String,
    status: String,
}

pub struct WhatsAppEventParser;

#[async_trait]
impl EventParser for WhatsAppEventParser {
    async fn parse(&self, request: &RuntimeRequest) -> Result<Vec<ParsedEvent>, ParseError> {
        let Some(body) = &request.body else {
            return Err(ParseError("request body is not valid JSON".to_string()));
        };

        let envelope: WebhookEnvelope = serde_json::from_value(body.clone())
            .map_err(|e| ParseError(format!("unrecognized webhook shape: {e}")))?;

        let mut events = Vec::new();

        for entry in envelope.entry {
            for change in entry.changes {
                let phone_number_id = &change.value.metadata.phone_number_id;

                for message in &change.value.messages {
                    events.push(ParsedEvent {
                        capability_id: CAPABILITY_INBOUND_MESSAGES.to_string(),
                        dedupe_key: format!("whatsapp:{phone_number_id}:msg:{}", message.id),
                        correlation_id: None,
                        tenant_id: None,
                        payload: serde_json::json!({
                            "messageId": message.id,
                            "messageType": message.message_type,
                            "from": message.from,
                            "phoneNumberId": phone_number_id,
                        }),
                    });
                }

                for status in &change.value.statuses {
                    events.push(ParsedEvent {
                        capability_id: CAPABILITY_MESSAGE_STATUS_UPDATES.to_string(),
                        dedupe_key: format!(
                            "whatsapp:{phone_number_id}:status:{}:{}",
                            status.id, status.status
                        ),
                        correlation_id: None,
                        tenant_id: None,
                        payload: serde_json::json!({
                            "messageId": status.id,
                            "status": status.status,
                            "phoneNumberId": phone_number_id,
                        }),
                    });
                }
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_body(body: serde_json::Value) -> RuntimeRequest {
        RuntimeRequest {
            headers: Default::default(),
            query: Default::default(),
            body: Some(body),
            raw_body: None,
        }
    }

    #[tokio::test]
    async fn single_text_message_produces_the_expected_dedupe_key() {
        let body = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "PHONE_ID_001" },
                        "messages": [{
                            "id": "wamid.fake.text.001",
                            "type": "text",
                            "from": "15550001111",
                        }]
                    }
                }]
            }]
        });

        let events = WhatsAppEventParser.parse(&request_with_body(body)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].capability_id, CAPABILITY_INBOUND_MESSAGES);
        assert_eq!(events[0].dedupe_key, "whatsapp:PHONE_ID_001:msg:wamid.fake.text.001");
    }

    #[tokio::test]
    async fn status_update_produces_status_scoped_dedupe_key() {
        let body = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "PHONE_ID_001" },
                        "statuses": [{ "id": "wamid.fake.001", "status": "delivered" }]
                    }
                }]
            }]
        });

        let events = WhatsAppEventParser.parse(&request_with_body(body)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].capability_id, CAPABILITY_MESSAGE_STATUS_UPDATES);
        assert_eq!(events[0].dedupe_key, "whatsapp:PHONE_ID_001:status:wamid.fake.001:delivered");
    }

    #[tokio::test]
    async fn envelope_with_no_entries_yields_an_empty_batch() {
        let events = WhatsAppEventParser.parse(&request_with_body(serde_json::json!({"nonsense": true}))).await;
        assert!(events.is_ok());
        assert!(events.unwrap().is_empty());
    }

    #[tokio::test]
    async fn body_missing_required_metadata_is_a_parse_error() {
        let body = serde_json::json!({
            "entry": [{ "changes": [{ "value": { "messages": [] } }] }]
        });
        let result = WhatsAppEventParser.parse(&request_with_body(body)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_body_is_a_parse_error() {
        let request = RuntimeRequest { headers: Default::default(), query: Default::default(), body: None, raw_body: None };
        let result = WhatsAppEventParser.parse(&request).await;
        assert!(result.is_err());
    }
}
