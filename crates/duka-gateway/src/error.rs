//! Gateway client error types.

/// Errors from Daraja gateway calls.
///
/// `Auth` and `Rejected` are the two initiation outcomes the checkout flow
/// distinguishes; the rest carry transport diagnostics for operators.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The OAuth credential exchange failed (bad credentials, gateway
    /// auth service down).
    #[error("gateway credential exchange failed: {reason}")]
    Auth {
        /// Human-readable description of the auth failure.
        reason: String,
    },

    /// The gateway rejected the push-payment submission (malformed
    /// shortcode/amount, subscriber unreachable, non-zero response code).
    #[error("push-payment rejected by gateway: {reason}")]
    Rejected {
        /// Description of why the submission was rejected.
        reason: String,
    },

    /// The request to the gateway timed out. For submissions this is
    /// surfaced as a failed initiation — no correlation key exists.
    #[error("gateway request timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds before the timeout triggered.
        elapsed_ms: u64,
    },

    /// HTTP transport error below the protocol level.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The gateway answered with a body we could not interpret.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
}
