//! Gateway result-callback envelope.
//!
//! The payment gateway delivers results wrapped in `Body.stkCallback`,
//! with success metadata as a name/value item list. Parsing is lenient:
//! a malformed envelope is reported, never panicked on, so the route can
//! acknowledge the delivery regardless.

use serde::Deserialize;
use serde_json::Value;

use duka_core::CorrelationKey;
use duka_store::CallbackOutcome;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedCallback {
    #[error("callback body is missing the result envelope")]
    MissingEnvelope,
    #[error("callback envelope carries no correlation identifier")]
    MissingCorrelationKey,
    #[error("callback envelope carries no result code")]
    MissingResultCode,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: Option<EnvelopeBody>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody {
    #[serde(rename = "stkCallback")]
    stk_callback: Option<StkCallback>,
}

#[derive(Debug, Deserialize)]
struct StkCallback {
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "ResultCode")]
    result_code: Option<i64>,
    #[serde(rename = "ResultDesc")]
    result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata")]
    metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
struct MetadataItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: Option<Value>,
}

impl CallbackMetadata {
    fn value(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
    }

    /// Amounts arrive as JSON numbers, sometimes with a fractional part
    /// (`500.0`). Whole shillings only.
    fn amount(&self) -> Option<u64> {
        let value = self.value("Amount")?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f.round() as u64))
    }

    /// Receipt numbers and phone numbers arrive as strings or bare
    /// numbers depending on the field; normalize both to strings.
    fn text(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Extract the correlation key and terminal outcome from a raw callback
/// body.
///
/// Success metadata fields are individually optional: a missing item
/// leaves its `CallbackOutcome` field `None` rather than failing the whole
/// callback. Only an absent envelope, correlation key, or result code is
/// malformed.
pub fn parse_callback(raw: &Value) -> Result<(CorrelationKey, CallbackOutcome), MalformedCallback> {
    let envelope: Envelope =
        serde_json::from_value(raw.clone()).map_err(|_| MalformedCallback::MissingEnvelope)?;
    let callback = envelope
        .body
        .and_then(|body| body.stk_callback)
        .ok_or(MalformedCallback::MissingEnvelope)?;

    let key = callback
        .checkout_request_id
        .and_then(|id| CorrelationKey::new(id).ok())
        .ok_or(MalformedCallback::MissingCorrelationKey)?;
    let result_code = callback
        .result_code
        .ok_or(MalformedCallback::MissingResultCode)?;
    let metadata = callback.metadata.unwrap_or_default();

    let outcome = CallbackOutcome {
        result_code,
        result_desc: callback
            .result_desc
            .unwrap_or_else(|| "unknown".to_string()),
        amount: metadata.amount(),
        receipt_number: metadata.text("MpesaReceiptNumber"),
        payer_phone: metadata.text("PhoneNumber"),
        transaction_timestamp: metadata.text("TransactionDate"),
    };
    Ok((key, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_store::PaymentState;
    use serde_json::json;

    fn success_body() -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            { "Name": "Amount", "Value": 1500.0 },
                            { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
                            { "Name": "TransactionDate", "Value": 20191219102115u64 },
                            { "Name": "PhoneNumber", "Value": 254708374149u64 }
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn success_callback_extracts_key_and_metadata() {
        let (key, outcome) = parse_callback(&success_body()).unwrap();
        assert_eq!(key.as_str(), "ws_CO_191220191020363925");
        assert_eq!(outcome.state(), PaymentState::Paid);
        assert_eq!(outcome.amount, Some(1500));
        assert_eq!(outcome.receipt_number.as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(outcome.payer_phone.as_deref(), Some("254708374149"));
        assert_eq!(outcome.transaction_timestamp.as_deref(), Some("20191219102115"));
    }

    #[test]
    fn failure_callback_has_no_metadata() {
        let body = json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        });
        let (_, outcome) = parse_callback(&body).unwrap();
        assert_eq!(outcome.state(), PaymentState::Failed);
        assert_eq!(outcome.result_desc, "Request cancelled by user");
        assert_eq!(outcome.amount, None);
        assert_eq!(outcome.receipt_number, None);
    }

    #[test]
    fn missing_metadata_items_fall_back_to_none() {
        let body = json!({
            "Body": {
                "stkCallback": {
                    "CheckoutRequestID": "ws_CO_1",
                    "ResultCode": 0,
                    "ResultDesc": "ok",
                    "CallbackMetadata": { "Item": [] }
                }
            }
        });
        let (_, outcome) = parse_callback(&body).unwrap();
        assert_eq!(outcome.state(), PaymentState::Paid);
        assert_eq!(outcome.amount, None);
        assert_eq!(outcome.payer_phone, None);
    }

    #[test]
    fn empty_body_is_malformed() {
        let err = parse_callback(&json!({})).unwrap_err();
        assert_eq!(err, MalformedCallback::MissingEnvelope);
    }

    #[test]
    fn envelope_without_callback_is_malformed() {
        let err = parse_callback(&json!({ "Body": {} })).unwrap_err();
        assert_eq!(err, MalformedCallback::MissingEnvelope);
    }

    #[test]
    fn missing_correlation_key_is_malformed() {
        let body = json!({
            "Body": { "stkCallback": { "ResultCode": 0, "ResultDesc": "ok" } }
        });
        let err = parse_callback(&body).unwrap_err();
        assert_eq!(err, MalformedCallback::MissingCorrelationKey);
    }

    #[test]
    fn missing_result_code_is_malformed() {
        let body = json!({
            "Body": { "stkCallback": { "CheckoutRequestID": "ws_CO_1" } }
        });
        let err = parse_callback(&body).unwrap_err();
        assert_eq!(err, MalformedCallback::MissingResultCode);
    }
}
