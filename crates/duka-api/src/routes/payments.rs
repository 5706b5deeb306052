//! # Payment Routes
//!
//! The three-legged payment flow:
//!
//! - `POST /v1/payments/initiate` — push a payment prompt to the payer's
//!   phone and hand the checkout its correlation key.
//! - `POST /v1/payments/callback` — the gateway's asynchronous result
//!   delivery. Always acknowledged with `200`; internal failures are
//!   absorbed and logged so the gateway never re-delivers on our account.
//! - `GET /v1/payments/status` — point lookup for checkout polling.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use duka_core::{AmountKes, CorrelationKey, Msisdn, Order};
use duka_fulfill::{FulfillmentContext, Orchestrator};
use duka_gateway::StkRequest;
use duka_store::{CorrelationStore, PaymentRequest, PaymentState};

use crate::callback::parse_callback;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/initiate", post(initiate_payment))
        .route("/v1/payments/callback", post(gateway_callback))
        .route("/v1/payments/status", get(payment_status))
}

/// Checkout request to start a payment.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    /// Payer phone; national trunk form (`07…`) is accepted.
    pub phone: String,
    /// Amount in whole Kenyan shillings.
    pub amount: u64,
    /// Reference shown on the payer's prompt; defaults to the brand.
    #[serde(default)]
    pub account_reference: Option<String>,
    /// The order being paid for, carried through to fulfillment.
    #[serde(default)]
    pub order: Option<Order>,
}

/// Correlation pair handed back to the checkout for status polling.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub correlation_key: String,
    pub merchant_request_id: String,
    /// Gateway-composed payer guidance ("check your phone…"), when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_message: Option<String>,
}

/// Unconditional acknowledgement returned to the gateway transport.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackAck {
    pub acknowledged: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    /// The correlation key returned by `POST /v1/payments/initiate`.
    pub correlation_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// `pending`, `paid`, or `failed`. Unknown keys report `pending`.
    pub status: PaymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

/// POST /v1/payments/initiate — Push a payment prompt to the payer.
#[utoipa::path(
    post,
    path = "/v1/payments/initiate",
    request_body = InitiateRequest,
    responses(
        (status = 200, description = "Payment prompt pushed", body = InitiateResponse),
        (status = 422, description = "Invalid phone, amount, or body", body = crate::error::ErrorBody),
        (status = 502, description = "Gateway declined or unreachable", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn initiate_payment(
    State(state): State<AppState>,
    body: Result<Json<InitiateRequest>, JsonRejection>,
) -> Result<Json<InitiateResponse>, AppError> {
    let req = extract_json(body)?;
    let phone = Msisdn::new(&req.phone)?;
    let amount = AmountKes::new(req.amount)?;
    let account_reference = req
        .account_reference
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| state.account_reference.clone());

    let mut order = req.order;
    if let Some(order) = order.as_mut() {
        order.ensure_order_id();
    }

    let submission = state
        .gateway
        .initiate(&StkRequest {
            phone: phone.clone(),
            amount,
            account_reference: account_reference.clone(),
        })
        .await?;

    tracing::info!(
        correlation_key = %submission.correlation_key,
        merchant_request_id = %submission.merchant_request_id,
        amount = amount.as_kes(),
        "payment prompt pushed"
    );

    state
        .store
        .record_request(PaymentRequest {
            correlation_key: submission.correlation_key.clone(),
            merchant_request_id: submission.merchant_request_id.clone(),
            phone,
            amount,
            account_reference,
            order,
            created_at: Utc::now(),
        })
        .await?;

    Ok(Json(InitiateResponse {
        correlation_key: submission.correlation_key.to_string(),
        merchant_request_id: submission.merchant_request_id,
        customer_message: submission.customer_message,
    }))
}

/// POST /v1/payments/callback — Gateway result delivery.
///
/// Hard protocol requirement: always `200 {"acknowledged": true}`. A
/// non-success response would make the gateway re-deliver, so malformed
/// bodies and store failures are logged and absorbed. Fulfillment is
/// spawned after the check-and-set commits; the acknowledgement never
/// waits on notification dispatch.
#[utoipa::path(
    post,
    path = "/v1/payments/callback",
    responses(
        (status = 200, description = "Delivery acknowledged", body = CallbackAck),
    ),
    tag = "payments"
)]
async fn gateway_callback(State(state): State<AppState>, body: Bytes) -> Json<CallbackAck> {
    let ack = Json(CallbackAck { acknowledged: true });

    let raw: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "callback body is not JSON; acknowledged without effect");
            return ack;
        }
    };

    let (key, outcome) = match parse_callback(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "malformed callback; acknowledged without effect");
            return ack;
        }
    };

    let applied = match state.store.apply_callback(&key, outcome.clone()).await {
        Ok(applied) => applied,
        Err(e) => {
            tracing::error!(correlation_key = %key, error = %e, "callback could not be recorded");
            return ack;
        }
    };

    tracing::info!(
        correlation_key = %key,
        result_code = outcome.result_code,
        state = applied.state.as_str(),
        fulfillment_due = applied.fulfillment_due,
        "callback recorded"
    );

    if applied.fulfillment_due {
        let order = match state.store.request(&key).await {
            Ok(request) => request.and_then(|r| r.order),
            Err(e) => {
                tracing::error!(correlation_key = %key, error = %e, "request lookup failed; fulfilling without order detail");
                None
            }
        };
        spawn_fulfillment(
            state.orchestrator.clone(),
            FulfillmentContext {
                correlation_key: key,
                order: order.unwrap_or_default(),
                amount_kes: outcome.amount.unwrap_or_default(),
                receipt_number: outcome.receipt_number,
                payer_phone: outcome.payer_phone,
            },
        );
    }

    ack
}

/// Run fulfillment on its own task so the gateway acknowledgement is not
/// delayed by notification dispatch. The at-most-once guard has already
/// committed; a duplicate delivery arriving meanwhile sees it and skips.
fn spawn_fulfillment(orchestrator: Arc<Orchestrator>, ctx: FulfillmentContext) {
    tokio::spawn(async move {
        let report = orchestrator.fulfill(&ctx).await;
        tracing::info!(
            correlation_key = %report.correlation_key,
            invoice_rendered = report.invoice_rendered,
            sent = report.sent_count(),
            failed = report.failed_count(),
            "fulfillment completed"
        );
    });
}

/// GET /v1/payments/status — Checkout status poll.
#[utoipa::path(
    get,
    path = "/v1/payments/status",
    params(StatusParams),
    responses(
        (status = 200, description = "Current payment state", body = StatusResponse),
        (status = 400, description = "Missing correlationKey parameter"),
    ),
    tag = "payments"
)]
async fn payment_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<StatusResponse>, AppError> {
    // An unparseable key is indistinguishable from an unknown one: both
    // poll as pending.
    let Ok(key) = CorrelationKey::new(params.correlation_key) else {
        return Ok(Json(StatusResponse {
            status: PaymentState::Pending,
            receipt_number: None,
            amount: None,
        }));
    };

    let status = state.store.status(&key).await?;
    Ok(Json(match status {
        Some(status) => StatusResponse {
            status: status.state,
            receipt_number: status.receipt_number,
            amount: status.amount,
        },
        None => StatusResponse {
            status: PaymentState::Pending,
            receipt_number: None,
            amount: None,
        },
    }))
}
