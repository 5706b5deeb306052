//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps gateway and store errors to HTTP status codes with JSON bodies.
//! Never exposes internal error details in responses — the checkout client
//! sees "try again", the operator sees the tracing output.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use duka_gateway::GatewayError;
use duka_store::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422 — syntactically valid HTTP,
    /// semantically invalid content; only malformed HTTP framing is 400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The gateway credential exchange failed (502).
    #[error("gateway authentication failed: {0}")]
    GatewayAuth(String),

    /// The gateway declined or timed out on the push submission (502).
    /// Surfaced to the checkout client as a retriable failure.
    #[error("gateway rejected the payment request: {0}")]
    GatewayRejected(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::GatewayAuth(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_AUTH"),
            Self::GatewayRejected(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_REJECTED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Upstream and internal detail stays server-side.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::GatewayAuth(_) | Self::GatewayRejected(_) => {
                "Payment could not be initiated. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::GatewayAuth(_) | Self::GatewayRejected(_) => {
                tracing::error!(error = %self, "gateway initiation failure")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<duka_core::ValidationError> for AppError {
    fn from(err: duka_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::Auth { .. } => Self::GatewayAuth(err.to_string()),
            // A submission timeout returned no correlation key; treating it
            // as rejected is the safe default.
            GatewayError::Rejected { .. } | GatewayError::Timeout { .. } => {
                Self::GatewayRejected(err.to_string())
            }
            GatewayError::Http { .. } | GatewayError::Deserialization { .. } => {
                Self::GatewayRejected(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
