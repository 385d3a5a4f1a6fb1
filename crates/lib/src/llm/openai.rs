//! OpenAI-compatible completion client (POST /chat/completions).
//!
//! Non-streaming only: one request per inbound message, reply length capped
//! so the generated text fits a WhatsApp message.

use crate::error::RelayError;
use crate::llm::prompt::render_reply_prompt;
use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible chat completion API. Immutable after
/// construction; safe to share across concurrently handled requests.
#[derive(Clone)]
pub struct CompletionClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_reply_tokens: u32,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_reply_tokens: u32,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            max_reply_tokens,
            client: reqwest::Client::new(),
        }
    }

    /// Generate a reply to one incoming message. Any underlying failure
    /// (transport, non-2xx, malformed response) is classified retryable with
    /// the cause embedded; retry policy belongs to the webhook sender.
    pub async fn generate_reply(&self, message_text: &str) -> Result<String, RelayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: render_reply_prompt(message_text),
            }],
            temperature: self.temperature,
            max_tokens: self.max_reply_tokens,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::retryable(format!("error during reply generation: {}", e)))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RelayError::retryable(format!(
                "error during reply generation: completion api returned {} {}",
                status, body
            )));
        }
        let data: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| RelayError::retryable(format!("error during reply generation: {}", e)))?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .unwrap_or_default();
        let reply = content.trim().to_string();
        if reply.is_empty() {
            return Err(RelayError::retryable(
                "error during reply generation: completion api returned no content",
            ));
        }
        Ok(reply)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}
