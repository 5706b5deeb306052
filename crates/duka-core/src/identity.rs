//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the payment pipeline. Each identifier is a
//! distinct type — you cannot pass a raw phone string where an [`Msisdn`] is
//! expected, and a [`CorrelationKey`] is the only thing that ties an
//! initiation to its asynchronous gateway callback.
//!
//! ## Validation
//!
//! All three newtypes validate at construction time and route `Deserialize`
//! through their `new()` constructors, so invalid values are rejected at the
//! wire boundary rather than silently accepted.
//!
//! ## MSISDN canonical form
//!
//! The gateway requires `254XXXXXXXXX` (country code, no `+`, digits only).
//! [`Msisdn::new`] accepts the forms observed from real checkout clients —
//! `07XXXXXXXX`, `01XXXXXXXX`, `+2547XXXXXXXX`, `2547XXXXXXXX`, with
//! arbitrary spacing/punctuation — and canonicalizes them. Canonicalization
//! is idempotent: feeding an already-canonical number back through is a
//! no-op.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for newtypes that must validate
/// their contents. Deserializes the raw representation, then routes through
/// the type's `new()` constructor so that invalid values are rejected at
/// deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident, $raw:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <$raw>::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// CorrelationKey
// ---------------------------------------------------------------------------

/// The gateway-issued identifier (Daraja: `CheckoutRequestID`) that
/// correlates a push-payment initiation with its asynchronous result
/// callback and with status polls.
///
/// Opaque to this system — the gateway mints it, we only compare it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct CorrelationKey(String);

impl_validating_deserialize!(CorrelationKey, String);

impl CorrelationKey {
    /// Create a correlation key, rejecting empty/blank strings.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyCorrelationKey);
        }
        Ok(Self(s))
    }

    /// Access the raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Msisdn
// ---------------------------------------------------------------------------

/// Kenya country calling code, used to replace the national trunk `0`.
const COUNTRY_CODE: &str = "254";

/// Canonical length of a Kenyan MSISDN: `254` + 9 subscriber digits.
const MSISDN_LEN: usize = 12;

/// A mobile subscriber number in canonical international form
/// (`254XXXXXXXXX`, digits only).
///
/// This is the form the gateway requires for `PartyA`/`PhoneNumber` and the
/// form the chat channel requires for recipients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct Msisdn(String);

impl_validating_deserialize!(Msisdn, String);

impl Msisdn {
    /// Canonicalize a phone number to `254XXXXXXXXX`.
    ///
    /// Accepted inputs: `07XXXXXXXX` / `01XXXXXXXX` (trunk-zero national
    /// form), `2547XXXXXXXX`, `+2547XXXXXXXX`, any of those with spaces or
    /// punctuation. Idempotent — canonical input passes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMsisdn`] when the digits cannot
    /// form a Kenyan mobile number.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        let canonical = if let Some(rest) = digits.strip_prefix('0') {
            // National trunk form: 07XX... / 01XX... → 2547XX... / 2541XX...
            format!("{COUNTRY_CODE}{rest}")
        } else {
            // `+254...` already lost its `+` in the digit filter.
            digits
        };

        if canonical.len() != MSISDN_LEN || !canonical.starts_with(COUNTRY_CODE) {
            return Err(ValidationError::InvalidMsisdn(raw));
        }
        Ok(Self(canonical))
    }

    /// Access the canonical digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Msisdn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AmountKes
// ---------------------------------------------------------------------------

/// Gateway transaction ceiling for a single push-payment, in whole shillings.
const MAX_AMOUNT_KES: u64 = 250_000;

/// A payment amount in whole Kenyan shillings.
///
/// The gateway accepts whole-shilling amounts only, so this is an integer by
/// construction — no floating point anywhere in the money path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub struct AmountKes(u64);

impl_validating_deserialize!(AmountKes, u64);

impl AmountKes {
    /// Create an amount, rejecting zero and values above the gateway ceiling.
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidAmount(
                "amount must be at least 1 KES".to_string(),
            ));
        }
        if value > MAX_AMOUNT_KES {
            return Err(ValidationError::InvalidAmount(format!(
                "amount {value} exceeds the {MAX_AMOUNT_KES} KES transaction ceiling"
            )));
        }
        Ok(Self(value))
    }

    /// The amount in whole shillings.
    pub fn as_kes(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AmountKes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KES {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_key_rejects_blank() {
        assert!(CorrelationKey::new("").is_err());
        assert!(CorrelationKey::new("   ").is_err());
        assert!(CorrelationKey::new("ws_CO_123").is_ok());
    }

    #[test]
    fn msisdn_replaces_trunk_zero() {
        let m = Msisdn::new("0712345678").unwrap();
        assert_eq!(m.as_str(), "254712345678");
    }

    #[test]
    fn msisdn_canonical_passthrough() {
        let m = Msisdn::new("254712345678").unwrap();
        assert_eq!(m.as_str(), "254712345678");
    }

    #[test]
    fn msisdn_strips_plus_and_spacing() {
        let m = Msisdn::new("+254 712-345 678").unwrap();
        assert_eq!(m.as_str(), "254712345678");
    }

    #[test]
    fn msisdn_normalization_is_idempotent() {
        let once = Msisdn::new("0711000111").unwrap();
        let twice = Msisdn::new(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn msisdn_accepts_landline_prefix_form() {
        // 01XX numbers are valid Safaricom allocations.
        let m = Msisdn::new("0110123456").unwrap();
        assert_eq!(m.as_str(), "254110123456");
    }

    #[test]
    fn msisdn_rejects_garbage() {
        assert!(Msisdn::new("").is_err());
        assert!(Msisdn::new("12345").is_err());
        assert!(Msisdn::new("44712345678").is_err());
        assert!(Msisdn::new("25471234567").is_err()); // one digit short
        assert!(Msisdn::new("2547123456789").is_err()); // one digit long
    }

    #[test]
    fn amount_bounds() {
        assert!(AmountKes::new(0).is_err());
        assert!(AmountKes::new(1).is_ok());
        assert!(AmountKes::new(250_000).is_ok());
        assert!(AmountKes::new(250_001).is_err());
    }

    #[test]
    fn validating_deserialize_rejects_bad_wire_values() {
        assert!(serde_json::from_str::<Msisdn>("\"not-a-phone\"").is_err());
        assert!(serde_json::from_str::<CorrelationKey>("\"\"").is_err());
        assert!(serde_json::from_str::<AmountKes>("0").is_err());

        let m: Msisdn = serde_json::from_str("\"0712345678\"").unwrap();
        assert_eq!(m.as_str(), "254712345678");
    }
}
