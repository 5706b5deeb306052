//! Record types held by the correlation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use duka_core::{AmountKes, CorrelationKey, Msisdn, Order};

/// The observable lifecycle of a push-payment.
///
/// `Pending` is never persisted — it is the reported state for keys with no
/// status record. Serialized lowercase, matching the polling contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    /// Awaiting the gateway's asynchronous result callback.
    Pending,
    /// The gateway reported a successful payment (`ResultCode == 0`).
    Paid,
    /// The gateway reported failure or cancellation (any other code).
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a successfully submitted push-payment initiation.
///
/// Created exactly once by the gateway client, never mutated, retained for
/// audit. The attached [`Order`] is an opaque payload carried through to
/// fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub correlation_key: CorrelationKey,
    /// Secondary gateway identifier (`MerchantRequestID`). Carried for
    /// traceability, never used for lookup.
    pub merchant_request_id: String,
    pub phone: Msisdn,
    pub amount: AmountKes,
    pub account_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    pub created_at: DateTime<Utc>,
}

/// Terminal outcome extracted from a gateway result callback.
///
/// Metadata fields are only populated by success callbacks; any of them may
/// still be absent (the extraction layer substitutes nothing rather than
/// sentinels here — sentinels are a rendering concern).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackOutcome {
    /// Raw gateway result code. `0` means paid.
    pub result_code: i64,
    /// Human-readable gateway description, preserved verbatim.
    pub result_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    /// Gateway receipt (`MpesaReceiptNumber`), e.g. `NLJ7RT61SV`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_phone: Option<String>,
    /// Gateway transaction timestamp in its native `YYYYMMDDHHMMSS` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_timestamp: Option<String>,
}

impl CallbackOutcome {
    /// The terminal state this outcome maps to.
    pub fn state(&self) -> PaymentState {
        if self.result_code == 0 {
            PaymentState::Paid
        } else {
            PaymentState::Failed
        }
    }
}

/// The mutable status record observed by pollers and the fulfillment
/// trigger. Owned exclusively by the store; mutated only via
/// [`crate::CorrelationStore::apply_callback`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub correlation_key: CorrelationKey,
    pub state: PaymentState,
    pub result_code: i64,
    pub result_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_timestamp: Option<String>,
    /// The at-most-once guard: set atomically with the first transition
    /// into [`PaymentState::Paid`], never cleared.
    pub fulfilled: bool,
    pub updated_at: DateTime<Utc>,
}

impl PaymentStatus {
    /// Build the record for a first-seen callback outcome.
    pub(crate) fn from_outcome(
        key: &CorrelationKey,
        outcome: &CallbackOutcome,
        fulfilled: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            correlation_key: key.clone(),
            state: outcome.state(),
            result_code: outcome.result_code,
            result_desc: outcome.result_desc.clone(),
            amount: outcome.amount,
            receipt_number: outcome.receipt_number.clone(),
            payer_phone: outcome.payer_phone.clone(),
            transaction_timestamp: outcome.transaction_timestamp.clone(),
            fulfilled,
            updated_at: now,
        }
    }
}

/// Result of a check-and-set callback application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackApplied {
    /// The state of the record after the write.
    pub state: PaymentState,
    /// True exactly when this write performed the first transition into
    /// [`PaymentState::Paid`] — the caller must run fulfillment, once.
    pub fulfillment_due: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_code_zero_is_paid() {
        let outcome = CallbackOutcome {
            result_code: 0,
            result_desc: "The service request is processed successfully.".into(),
            amount: Some(500),
            receipt_number: Some("NLJ7RT61SV".into()),
            payer_phone: Some("254711000111".into()),
            transaction_timestamp: Some("20260826121518".into()),
        };
        assert_eq!(outcome.state(), PaymentState::Paid);
    }

    #[test]
    fn nonzero_result_code_is_failed() {
        let outcome = CallbackOutcome {
            result_code: 1032,
            result_desc: "Request cancelled by user".into(),
            amount: None,
            receipt_number: None,
            payer_phone: None,
            transaction_timestamp: None,
        };
        assert_eq!(outcome.state(), PaymentState::Failed);
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(PaymentState::Paid).unwrap(),
            serde_json::json!("paid")
        );
        assert_eq!(PaymentState::Pending.to_string(), "pending");
    }
}
