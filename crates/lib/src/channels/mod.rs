//! Messaging platform clients (WhatsApp Business API).
//!
//! Webhook verification, payload unpacking, and outbound sends live here so
//! the gateway stays transport-only.

mod whatsapp;

pub use whatsapp::{MessageText, WebhookMessage, WhatsAppClient};
