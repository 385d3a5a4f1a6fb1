//! WhatsApp Business API client: webhook verification, payload unpacking,
//! and sendMessage via the Graph API.

use crate::error::RelayError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// One message object from a webhook delivery. Non-text messages (media,
/// reactions, location) deserialize with `text: None` and are skipped by
/// the pipeline, not rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    /// Sender wa_id; doubles as the reply recipient.
    pub from: String,
    #[serde(default)]
    pub text: Option<MessageText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    pub body: String,
}

impl WebhookMessage {
    /// Text body when this is a text message, None otherwise.
    pub fn text_body(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.body.as_str())
    }
}

/// Client for the WhatsApp Business API. Immutable after construction; safe
/// to share across concurrently handled requests.
#[derive(Clone)]
pub struct WhatsAppClient {
    api_url: String,
    verify_token: String,
    access_token: String,
    phone_number_id: String,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(
        api_url: impl Into<String>,
        verify_token: impl Into<String>,
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            verify_token: verify_token.into(),
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Verify the webhook handshake (GET with hub.* query params).
    ///
    /// Compares `hub.verify_token` against the configured secret with exact
    /// string equality; an absent token counts as a mismatch. On match the
    /// `hub.challenge` value is returned unchanged for echoing back.
    pub fn verify_webhook(&self, params: &HashMap<String, String>) -> Result<String, RelayError> {
        match params.get("hub.verify_token") {
            Some(token) if *token == self.verify_token => {
                Ok(params.get("hub.challenge").cloned().unwrap_or_default())
            }
            _ => Err(RelayError::authorization("webhook verification token mismatch")),
        }
    }

    /// Extract the message list from a webhook delivery payload.
    ///
    /// Navigates the fixed path `entry[0].changes[0].value.messages`. A
    /// structurally absent path (missing key, wrong type, empty array) is
    /// always retryable; a present-but-empty list is a valid zero-message
    /// delivery (e.g. a status update) and returns an empty vec.
    pub fn unpack_messages(&self, payload: &Value) -> Result<Vec<WebhookMessage>, RelayError> {
        let list = message_list(payload)
            .map_err(|cause| RelayError::retryable(format!("error during payload extraction: {}", cause)))?;
        list.iter()
            .map(|item| {
                serde_json::from_value::<WebhookMessage>(item.clone()).map_err(|e| {
                    RelayError::retryable(format!("error during payload extraction: bad message object: {}", e))
                })
            })
            .collect()
    }

    /// Send a text message to a recipient via the Graph API.
    ///
    /// A 5xx from the platform or a transport failure is retryable (the
    /// inbound webhook should be redelivered); any other non-2xx is logged
    /// and swallowed so a permanently-bad recipient cannot trigger an
    /// endless redelivery loop.
    pub async fn send_message(&self, text: &str, recipient: &str) -> Result<(), RelayError> {
        let url = format!("{}/{}/messages", self.api_url, self.phone_number_id);
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "preview_url": false, "body": text }
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::retryable(format!("error sending message: {}", e)))?;
        let status = res.status();
        if status.is_server_error() {
            return Err(RelayError::retryable(format!(
                "whatsapp api 5xx error: {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            log::warn!("whatsapp api non-retryable error ({}): {}", status.as_u16(), body);
        }
        Ok(())
    }
}

/// Schema-matching step for the webhook delivery shape. Returns the
/// `messages` array or the first path segment that failed, so the caller
/// can surface a precise cause.
fn message_list(payload: &Value) -> Result<&Vec<Value>, String> {
    let entry = payload
        .get("entry")
        .ok_or("missing field `entry`")?
        .as_array()
        .ok_or("`entry` is not a list")?;
    let first_entry = entry.first().ok_or("`entry` is empty")?;
    let changes = first_entry
        .get("changes")
        .ok_or("missing field `changes`")?
        .as_array()
        .ok_or("`changes` is not a list")?;
    let first_change = changes.first().ok_or("`changes` is empty")?;
    let value = first_change.get("value").ok_or("missing field `value`")?;
    value
        .get("messages")
        .ok_or("missing field `messages`")?
        .as_array()
        .ok_or("`messages` is not a list".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> WhatsAppClient {
        WhatsAppClient::new("https://graph.example.test/v23.0", "v3rify", "t0ken", "4242")
    }

    fn verification_params(token: &str, challenge: &str) -> HashMap<String, String> {
        HashMap::from([
            ("hub.mode".to_string(), "subscribe".to_string()),
            ("hub.verify_token".to_string(), token.to_string()),
            ("hub.challenge".to_string(), challenge.to_string()),
        ])
    }

    fn delivery(messages: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "0",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": messages
                    }
                }]
            }]
        })
    }

    #[test]
    fn verify_returns_challenge_on_match() {
        let params = verification_params("v3rify", "123456");
        assert_eq!(client().verify_webhook(&params).expect("verified"), "123456");
    }

    #[test]
    fn verify_rejects_wrong_token() {
        let params = verification_params("nope", "123456");
        assert!(matches!(
            client().verify_webhook(&params),
            Err(RelayError::Authorization(_))
        ));
    }

    #[test]
    fn verify_rejects_absent_token() {
        assert!(matches!(
            client().verify_webhook(&HashMap::new()),
            Err(RelayError::Authorization(_))
        ));
    }

    #[test]
    fn unpack_returns_text_messages() {
        let payload = delivery(json!([
            { "from": "15551234567", "id": "wamid.A", "type": "text", "text": { "body": "hi" } }
        ]));
        let messages = client().unpack_messages(&payload).expect("unpacked");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].from, "15551234567");
        assert_eq!(messages[0].text_body(), Some("hi"));
    }

    #[test]
    fn unpack_keeps_non_text_messages_with_empty_body() {
        let payload = delivery(json!([
            { "from": "15551234567", "id": "wamid.B", "type": "image", "image": { "id": "9" } }
        ]));
        let messages = client().unpack_messages(&payload).expect("unpacked");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text_body(), None);
    }

    #[test]
    fn unpack_accepts_empty_message_list() {
        let payload = delivery(json!([]));
        let messages = client().unpack_messages(&payload).expect("unpacked");
        assert!(messages.is_empty());
    }

    #[test]
    fn unpack_rejects_missing_path_segments() {
        let malformed = [
            json!({}),
            json!({ "entry": [] }),
            json!({ "entry": "not-a-list" }),
            json!({ "entry": [{ "changes": [] }] }),
            json!({ "entry": [{ "changes": [{ "value": {} }] }] }),
            json!({ "entry": [{ "changes": [{ "value": { "messages": 7 } }] }] }),
        ];
        for payload in &malformed {
            match client().unpack_messages(payload) {
                Err(RelayError::Retryable(msg)) => {
                    assert!(msg.contains("error during payload extraction"), "got: {}", msg)
                }
                other => panic!("expected retryable error for {}, got {:?}", payload, other.map(|m| m.len())),
            }
        }
    }

    #[test]
    fn unpack_rejects_message_without_sender() {
        let payload = delivery(json!([{ "type": "text", "text": { "body": "hi" } }]));
        assert!(matches!(
            client().unpack_messages(&payload),
            Err(RelayError::Retryable(_))
        ));
    }
}
