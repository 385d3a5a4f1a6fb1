//! Webhook HTTP server: verification handshake and message delivery relay.

use crate::channels::WhatsAppClient;
use crate::commands;
use crate::config::{self, Config};
use crate::error::RelayError;
use crate::llm::CompletionClient;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state for the relay (config plus the two injected clients).
/// Clients are constructed once at startup; handlers only read.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    pub whatsapp: Arc<WhatsAppClient>,
    pub completion: Arc<CompletionClient>,
}

/// The single boundary translating classified failures to transport
/// statuses. Business logic stays transport-agnostic; this is the whole
/// HTTP contract with the retry-driving caller.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::Retryable(msg) => {
                log::warn!("retryable error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg }))
            }
            RelayError::Authorization(msg) => {
                log::warn!("authorization error: {}", msg);
                (StatusCode::FORBIDDEN, json!({ "error": msg }))
            }
            RelayError::Validation(msg) => {
                log::warn!("validation error: {}", msg);
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            RelayError::Internal(msg) => {
                log::error!("unhandled error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Build the webhook router. Split out of run_gateway so tests can serve it
/// against stub upstreams.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(verify_webhook).post(receive_webhook))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// GET / — webhook verification handshake. Echoes hub.challenge when the
/// verify token matches; 403 otherwise.
async fn verify_webhook(
    State(state): State<RelayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, RelayError> {
    let challenge = state.whatsapp.verify_webhook(&params)?;
    log::info!("webhook verification handshake succeeded");
    Ok(challenge)
}

/// POST / — message delivery. Unpacks the envelope and relays each text
/// message in arrival order: command replies are answered locally, anything
/// else goes through the completion client. The first classified failure
/// aborts the whole request so the platform redelivers the envelope;
/// at-least-once processing with duplicate sends is the accepted tradeoff.
async fn receive_webhook(
    State(state): State<RelayState>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| RelayError::retryable(format!("error during payload extraction: {}", e)))?;
    let messages = state.whatsapp.unpack_messages(&payload)?;
    log::debug!("webhook delivery contained {} message(s)", messages.len());

    for message in &messages {
        let text = match message.text_body() {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                log::debug!("skipping non-text message from {}", message.from);
                continue;
            }
        };
        let reply = match commands::execute(text, &message.from) {
            Some(reply) => reply,
            None => state.completion.generate_reply(text).await?,
        };
        state.whatsapp.send_message(&reply, &message.from).await?;
        log::info!("relayed reply to {}", message.from);
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// GET /healthz returns a simple health JSON (for probes).
async fn healthz(State(state): State<RelayState>) -> Json<Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}

/// Build the relay state from config: resolve credentials (env overrides
/// config) and construct the two clients once. Fails when a required
/// credential is missing.
pub fn build_state(config: Config) -> Result<RelayState> {
    let verify_token = config::resolve_verify_token(&config)
        .context("whatsapp verify token not configured (set whatsapp.verifyToken or WHATSAPP_WEBHOOK_VERIFY_TOKEN)")?;
    let access_token = config::resolve_access_token(&config)
        .context("whatsapp access token not configured (set whatsapp.accessToken or WHATSAPP_ACCESS_TOKEN)")?;
    let phone_number_id = config::resolve_phone_number_id(&config)
        .context("whatsapp phone number id not configured (set whatsapp.phoneNumberId or WHATSAPP_PHONE_NUMBER_ID)")?;
    let api_key = config::resolve_openai_api_key(&config)
        .context("completion api key not configured (set openai.apiKey or OPENAI_API_KEY)")?;

    let whatsapp = WhatsAppClient::new(
        config::resolve_whatsapp_api_url(&config),
        verify_token,
        access_token,
        phone_number_id,
    );
    let completion = CompletionClient::new(
        config::resolve_openai_api_url(&config),
        api_key,
        config::resolve_openai_model(&config),
        config.openai.temperature,
        config.openai.max_reply_tokens,
    );
    Ok(RelayState {
        config: Arc::new(config),
        whatsapp: Arc::new(whatsapp),
        completion: Arc::new(completion),
    })
}

/// Run the webhook server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bind = config.gateway.bind.trim().to_string();
    let port = config.gateway.port;
    let state = build_state(config)?;
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server exited")?;
    log::info!("relay stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}
