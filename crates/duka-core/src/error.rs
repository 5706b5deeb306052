//! Validation error hierarchy for duka-core newtypes.

use thiserror::Error;

/// Errors raised when constructing a validated domain primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The phone number cannot be canonicalized to a Kenyan MSISDN.
    #[error("invalid MSISDN: {0}")]
    InvalidMsisdn(String),

    /// The correlation key is empty or blank.
    #[error("correlation key must not be empty")]
    EmptyCorrelationKey,

    /// The amount is zero or exceeds the gateway's transaction ceiling.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// An order line item is structurally invalid.
    #[error("invalid line item: {0}")]
    InvalidLineItem(String),
}
