//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relai/config.json`) and environment.
//! Credentials can always be supplied via environment variables; the file covers
//! everything else (bind, port, API base URLs, model tuning).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Business API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Completion service settings (OpenAI-compatible API).
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook HTTP server (default 8686).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"; set to "0.0.0.0" behind a reverse proxy).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8686
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// WhatsApp Business API config (Graph API base, webhook secret, credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Graph API base URL. Overridden by WHATSAPP_API_URL env when set.
    #[serde(default = "default_whatsapp_api_url")]
    pub api_url: String,

    /// Shared secret echoed during the webhook verification handshake.
    /// Overridden by WHATSAPP_WEBHOOK_VERIFY_TOKEN env when set.
    pub verify_token: Option<String>,

    /// Access token for outbound sends. Overridden by WHATSAPP_ACCESS_TOKEN env when set.
    pub access_token: Option<String>,

    /// Phone number id the replies are sent from. Overridden by WHATSAPP_PHONE_NUMBER_ID env when set.
    pub phone_number_id: Option<String>,
}

fn default_whatsapp_api_url() -> String {
    "https://graph.facebook.com/v23.0".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: default_whatsapp_api_url(),
            verify_token: None,
            access_token: None,
            phone_number_id: None,
        }
    }
}

/// Completion service config (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API base URL (the segment before `/chat/completions`).
    /// Overridden by OPENAI_API_URL env when set.
    #[serde(default = "default_openai_api_url")]
    pub api_url: String,

    /// API key. Overridden by OPENAI_API_KEY env when set.
    pub api_key: Option<String>,

    /// Model id passed to the completion API. Overridden by OPENAI_MODEL env when set.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature for replies (0.0-2.0).
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,

    /// Cap on generated reply tokens, sized for WhatsApp message length.
    #[serde(default = "default_max_reply_tokens")]
    pub max_reply_tokens: u32,
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_temperature() -> f32 {
    0.7
}

fn default_max_reply_tokens() -> u32 {
    150
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_url: default_openai_api_url(),
            api_key: None,
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_reply_tokens: default_max_reply_tokens(),
        }
    }
}

/// Non-empty env var value, trimmed; None when unset or blank.
fn env_override(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the WhatsApp API base URL: env WHATSAPP_API_URL overrides config.
pub fn resolve_whatsapp_api_url(config: &Config) -> String {
    env_override("WHATSAPP_API_URL")
        .unwrap_or_else(|| config.whatsapp.api_url.clone())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the webhook verify token: env WHATSAPP_WEBHOOK_VERIFY_TOKEN overrides config.
pub fn resolve_verify_token(config: &Config) -> Option<String> {
    env_override("WHATSAPP_WEBHOOK_VERIFY_TOKEN").or_else(|| non_empty(config.whatsapp.verify_token.as_ref()))
}

/// Resolve the WhatsApp access token: env WHATSAPP_ACCESS_TOKEN overrides config.
pub fn resolve_access_token(config: &Config) -> Option<String> {
    env_override("WHATSAPP_ACCESS_TOKEN").or_else(|| non_empty(config.whatsapp.access_token.as_ref()))
}

/// Resolve the sending phone number id: env WHATSAPP_PHONE_NUMBER_ID overrides config.
pub fn resolve_phone_number_id(config: &Config) -> Option<String> {
    env_override("WHATSAPP_PHONE_NUMBER_ID").or_else(|| non_empty(config.whatsapp.phone_number_id.as_ref()))
}

/// Resolve the completion API base URL: env OPENAI_API_URL overrides config.
pub fn resolve_openai_api_url(config: &Config) -> String {
    env_override("OPENAI_API_URL")
        .unwrap_or_else(|| config.openai.api_url.clone())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the completion API key: env OPENAI_API_KEY overrides config.
pub fn resolve_openai_api_key(config: &Config) -> Option<String> {
    env_override("OPENAI_API_KEY").or_else(|| non_empty(config.openai.api_key.as_ref()))
}

/// Resolve the completion model id: env OPENAI_MODEL overrides config.
pub fn resolve_openai_model(config: &Config) -> String {
    env_override("OPENAI_MODEL").unwrap_or_else(|| config.openai.model.trim().to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAI_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relai").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or RELAI_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8686);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn default_reply_tuning() {
        let o = OpenAiConfig::default();
        assert_eq!(o.max_reply_tokens, 150);
        assert!(o.temperature > 0.0);
        assert_eq!(o.api_url, "https://api.openai.com/v1");
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 9000 },
                "whatsapp": { "verifyToken": "s3cret", "phoneNumberId": "123" },
                "openai": { "maxReplyTokens": 80 }
            }"#,
        )
        .expect("parse config");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.whatsapp.verify_token.as_deref(), Some("s3cret"));
        assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("123"));
        assert_eq!(config.openai.max_reply_tokens, 80);
    }

    #[test]
    fn blank_config_token_resolves_to_none() {
        let mut config = Config::default();
        config.whatsapp.verify_token = Some("   ".to_string());
        assert_eq!(non_empty(config.whatsapp.verify_token.as_ref()), None);
    }
}
