//! # duka-gateway — Daraja Push-Payment Client
//!
//! Typed HTTP client for the Daraja-style mobile-money gateway. Two
//! sequential calls make up an initiation:
//!
//! 1. **Credential exchange** — `GET /oauth/v1/generate` with Basic auth,
//!    yielding a short-lived bearer token. Tokens are cached until shortly
//!    before their stated expiry and refreshed on demand. The exchange is
//!    idempotent, so transient transport failures are retried.
//!
//! 2. **Push submission** — `POST /mpesa/stkpush/v1/processrequest` with a
//!    password derived from `base64(shortcode ‖ passkey ‖ timestamp)` at
//!    second precision. Submission is **single-attempt by design**: a
//!    duplicate submission prompts the customer's device twice and risks a
//!    double charge, so no retry exists on this path, and a timeout is
//!    reported as a rejection (no correlation key was durably returned —
//!    treating the outcome as failed is the safe default).
//!
//! On success the gateway returns the correlation pair: the
//! `CheckoutRequestID` (our [`duka_core::CorrelationKey`]) that the
//! asynchronous result callback will carry, and the `MerchantRequestID`
//! kept for traceability.

pub mod client;
pub mod error;
pub mod password;

pub use client::{DarajaClient, GatewayConfig, StkRequest, StkSubmission};
pub use error::GatewayError;
pub use password::{daraja_timestamp, stk_password};
