//! Daraja timestamp and password derivation.
//!
//! The gateway authenticates each STK push with a password derived
//! deterministically from the shortcode, the passkey, and a timestamp in
//! the gateway's second-precision numeric format. The same timestamp string
//! must be sent alongside the password — deriving them separately is the
//! classic integration bug, so both are produced from one instant here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Format an instant in the gateway's `YYYYMMDDHHMMSS` form.
pub fn daraja_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Derive the STK push password: `base64(shortcode ‖ passkey ‖ timestamp)`.
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_is_fourteen_digits_second_precision() {
        let at = Utc.with_ymd_and_hms(2026, 8, 26, 9, 5, 3).unwrap();
        let ts = daraja_timestamp(at);
        assert_eq!(ts, "20260826090503");
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn password_matches_known_vector() {
        // base64("174379" + "passkey" + "20260826090503")
        let password = stk_password("174379", "passkey", "20260826090503");
        assert_eq!(
            password,
            STANDARD.encode("174379passkey20260826090503")
        );
        // Deterministic: same inputs, same password.
        assert_eq!(password, stk_password("174379", "passkey", "20260826090503"));
    }
}
