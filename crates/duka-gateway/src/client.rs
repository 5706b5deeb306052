//! The Daraja gateway client: credential exchange and STK push submission.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};

use duka_core::{AmountKes, CorrelationKey, Msisdn, ValidationError};

use crate::error::GatewayError;
use crate::password::{daraja_timestamp, stk_password};

/// Safety margin subtracted from the gateway's stated token lifetime: a
/// token within this window of expiry is treated as already expired.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Retry attempts for the credential exchange (idempotent; transport
/// failures only). The STK submission itself is never retried.
const TOKEN_MAX_RETRIES: u32 = 2;

/// Base delay between token retries (doubles each attempt).
const TOKEN_RETRY_BASE_DELAY_MS: u64 = 200;

/// Configuration for the Daraja gateway client.
///
/// All values are injected — credentials never have defaults and are never
/// read from anywhere but the operator-supplied configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g. `https://sandbox.safaricom.co.ke`).
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Business shortcode (PartyB / BusinessShortCode).
    pub shortcode: String,
    pub passkey: String,
    /// Public HTTPS URL the gateway will deliver result callbacks to.
    pub callback_url: String,
    /// Text shown on the payer's statement line.
    pub transaction_desc: String,
    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        shortcode: impl Into<String>,
        passkey: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            shortcode: shortcode.into(),
            passkey: passkey.into(),
            callback_url: callback_url.into(),
            transaction_desc: "Duka Pay purchase".to_string(),
            timeout_secs: 30,
        }
    }
}

/// A push-payment initiation, validated upstream.
#[derive(Debug, Clone)]
pub struct StkRequest {
    pub phone: Msisdn,
    pub amount: AmountKes,
    /// Account reference shown to the payer (brand or order handle).
    pub account_reference: String,
}

/// The correlation pair returned by a successful submission.
#[derive(Debug, Clone)]
pub struct StkSubmission {
    /// Gateway `CheckoutRequestID` — the key the result callback will carry.
    pub correlation_key: CorrelationKey,
    /// Gateway `MerchantRequestID`, carried for traceability.
    pub merchant_request_id: String,
    /// Gateway-composed text for the payer ("check your phone…").
    pub customer_message: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// HTTP client for the Daraja gateway.
///
/// `Send + Sync`; share via `Arc` across request tasks. The token cache is
/// internal — callers just call [`DarajaClient::initiate`].
pub struct DarajaClient {
    client: reqwest::Client,
    config: GatewayConfig,
    token: Mutex<Option<CachedToken>>,
}

impl DarajaClient {
    /// Build a client from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Auth {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        let config = GatewayConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout_secs * 1000
    }

    /// A valid bearer token, from cache or via a fresh credential exchange.
    async fn access_token(&self) -> Result<String, GatewayError> {
        if let Some(cached) = self.token.lock().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        let fetched = self.fetch_token().await?;
        let token = fetched.access_token.clone();
        let lifetime = Duration::from_secs(fetched.expires_in)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.lock() = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    /// Credential exchange with bounded retry on transport failure.
    async fn fetch_token(&self) -> Result<TokenResponse, GatewayError> {
        let endpoint = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.config.consumer_key, self.config.consumer_secret
        ));

        let mut attempt = 0;
        let resp = loop {
            let result = self
                .client
                .get(&endpoint)
                .header(reqwest::header::AUTHORIZATION, format!("Basic {basic}"))
                .send()
                .await;
            match result {
                Ok(resp) => break resp,
                Err(e) if attempt < TOKEN_MAX_RETRIES => {
                    let delay =
                        Duration::from_millis(TOKEN_RETRY_BASE_DELAY_MS * 2u64.pow(attempt));
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = TOKEN_MAX_RETRIES,
                        "credential exchange transport failure, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(GatewayError::Timeout {
                        elapsed_ms: self.timeout_ms(),
                    })
                }
                Err(e) => {
                    return Err(GatewayError::Http {
                        endpoint,
                        source: e,
                    })
                }
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Auth {
                reason: format!("credential exchange returned HTTP {status}: {body}"),
            });
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| GatewayError::Deserialization {
                endpoint,
                reason: e.to_string(),
            })
    }

    /// Submit an STK push. Single attempt; returns the correlation pair.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Auth`] when the credential exchange fails,
    /// [`GatewayError::Rejected`] when the gateway declines the submission,
    /// [`GatewayError::Timeout`] when the submission times out (treated by
    /// callers as a failed initiation — no key was returned).
    pub async fn initiate(&self, request: &StkRequest) -> Result<StkSubmission, GatewayError> {
        let token = self.access_token().await?;

        let timestamp = daraja_timestamp(Utc::now());
        let password = stk_password(&self.config.shortcode, &self.config.passkey, &timestamp);
        let endpoint = format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url);

        let body = StkPushBody {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: request.amount.as_kes(),
            party_a: request.phone.as_str().to_string(),
            party_b: self.config.shortcode.clone(),
            phone_number: request.phone.as_str().to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: request.account_reference.clone(),
            transaction_desc: self.config.transaction_desc.clone(),
        };

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        elapsed_ms: self.timeout_ms(),
                    }
                } else {
                    GatewayError::Http {
                        endpoint: endpoint.clone(),
                        source: e,
                    }
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let submission: StkPushResponse =
            resp.json()
                .await
                .map_err(|e| GatewayError::Deserialization {
                    endpoint,
                    reason: e.to_string(),
                })?;

        if submission.response_code != "0" {
            return Err(GatewayError::Rejected {
                reason: format!(
                    "response code {}: {}",
                    submission.response_code,
                    submission.response_description.as_deref().unwrap_or("-")
                ),
            });
        }

        let correlation_key = CorrelationKey::new(submission.checkout_request_id)
            .map_err(|e: ValidationError| GatewayError::Deserialization {
                endpoint: "stkpush".to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            correlation_key = %correlation_key,
            merchant_request_id = %submission.merchant_request_id,
            amount = %request.amount,
            "STK push accepted by gateway"
        );

        Ok(StkSubmission {
            correlation_key,
            merchant_request_id: submission.merchant_request_id,
            customer_message: submission.customer_message,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// OAuth token response. The gateway quotes `expires_in` as a string
/// (`"3599"`); tolerate both string and number.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(deserialize_with = "string_or_u64")]
    expires_in: u64,
}

fn string_or_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// STK push request body in the gateway's exact field naming.
#[derive(Debug, Serialize)]
struct StkPushBody {
    #[serde(rename = "BusinessShortCode")]
    business_short_code: String,
    #[serde(rename = "Password")]
    password: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "TransactionType")]
    transaction_type: String,
    #[serde(rename = "Amount")]
    amount: u64,
    #[serde(rename = "PartyA")]
    party_a: String,
    #[serde(rename = "PartyB")]
    party_b: String,
    #[serde(rename = "PhoneNumber")]
    phone_number: String,
    #[serde(rename = "CallBackURL")]
    callback_url: String,
    #[serde(rename = "AccountReference")]
    account_reference: String,
    #[serde(rename = "TransactionDesc")]
    transaction_desc: String,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    response_code: String,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    customer_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GatewayConfig {
        GatewayConfig::new(
            server.uri(),
            "ck",
            "cs",
            "174379",
            "passkey",
            "https://shop.example/v1/payments/callback",
        )
    }

    fn stk_request() -> StkRequest {
        StkRequest {
            phone: Msisdn::new("0711000111").unwrap(),
            amount: AmountKes::new(500).unwrap(),
            account_reference: "DukaPay".to_string(),
        }
    }

    async fn mount_token(server: &MockServer, expect: u64) {
        Mock::given(method("GET"))
            .and(path("/oauth/v1/generate"))
            .and(header("authorization", format!("Basic {}", STANDARD.encode("ck:cs"))))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": "3599"
            })))
            .expect(expect)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn initiate_returns_correlation_pair() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/mpesa/stkpush/v1/processrequest"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_partial_json(serde_json::json!({
                "BusinessShortCode": "174379",
                "TransactionType": "CustomerPayBillOnline",
                "Amount": 500,
                "PartyA": "254711000111",
                "PhoneNumber": "254711000111",
                "CallBackURL": "https://shop.example/v1/payments/callback"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResponseCode": "0",
                "ResponseDescription": "Success. Request accepted for processing",
                "CustomerMessage": "Success. Request accepted for processing"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DarajaClient::new(config_for(&server)).unwrap();
        let submission = client.initiate(&stk_request()).await.unwrap();

        assert_eq!(
            submission.correlation_key.as_str(),
            "ws_CO_191220191020363925"
        );
        assert_eq!(submission.merchant_request_id, "29115-34620561-1");
        assert!(submission.customer_message.is_some());
    }

    #[tokio::test]
    async fn token_is_cached_across_initiations() {
        let server = MockServer::start().await;
        // A single credential exchange must serve both submissions.
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/mpesa/stkpush/v1/processrequest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MerchantRequestID": "m",
                "CheckoutRequestID": "ws_CO_1",
                "ResponseCode": "0"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = DarajaClient::new(config_for(&server)).unwrap();
        client.initiate(&stk_request()).await.unwrap();
        client.initiate(&stk_request()).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_response_code_is_rejected() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/mpesa/stkpush/v1/processrequest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MerchantRequestID": "m",
                "CheckoutRequestID": "ws_CO_1",
                "ResponseCode": "1",
                "ResponseDescription": "Invalid Amount"
            })))
            .mount(&server)
            .await;

        let client = DarajaClient::new(config_for(&server)).unwrap();
        let err = client.initiate(&stk_request()).await.unwrap_err();
        match err {
            GatewayError::Rejected { reason } => assert!(reason.contains("Invalid Amount")),
            other => panic!("expected Rejected, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_from_submission_is_rejected() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/mpesa/stkpush/v1/processrequest"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "requestId": "r",
                "errorCode": "400.002.02",
                "errorMessage": "Bad Request - Invalid PhoneNumber"
            })))
            .mount(&server)
            .await;

        let client = DarajaClient::new(config_for(&server)).unwrap();
        let err = client.initiate(&stk_request()).await.unwrap_err();
        match err {
            GatewayError::Rejected { reason } => {
                assert!(reason.contains("Invalid PhoneNumber"))
            }
            other => panic!("expected Rejected, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_credential_exchange_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/v1/generate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = DarajaClient::new(config_for(&server)).unwrap();
        let err = client.initiate(&stk_request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth { .. }));
    }

    #[tokio::test]
    async fn numeric_expires_in_accepted() {
        let raw = serde_json::json!({ "access_token": "t", "expires_in": 3599 });
        let parsed: TokenResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.expires_in, 3599);
    }
}
