//! Failure taxonomy for the relay pipeline.
//!
//! Every fallible client call returns one of these kinds; the gateway
//! translates them to HTTP statuses at a single boundary. The kind encodes
//! the remedy for the webhook sender: redeliver, fix configuration, fix the
//! request, or nothing (unexpected).

use thiserror::Error;

/// Classified relay failure. Raised at the deepest client call and
/// propagated unmodified to the gateway boundary.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transient condition (unexpected payload shape, network failure,
    /// upstream 5xx); redelivering the webhook is the correct remedy.
    #[error("{0}")]
    Retryable(String),

    /// Webhook verification failure (wrong or missing verify token).
    /// Terminal: the caller must fix its configuration, not resend.
    #[error("{0}")]
    Authorization(String),

    /// Malformed caller input unrelated to transient conditions. Not raised
    /// by current logic; kept in the taxonomy so the status mapping is fixed.
    #[error("{0}")]
    Validation(String),

    /// Unclassified failure. The message is logged at the boundary; the
    /// HTTP body carries only a generic error.
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        RelayError::Retryable(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        RelayError::Authorization(msg.into())
    }
}
