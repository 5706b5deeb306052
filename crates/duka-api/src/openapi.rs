//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented payment routes into a single OpenAPI
//! spec, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the payment API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Duka Pay — M-Pesa Checkout API",
        version = "0.3.2",
        description = "Mobile-money checkout for the Duka storefront.\n\nProvides:\n- **Payment initiation** via STK push, returning a correlation key the checkout polls with\n- **Gateway result callback** ingestion, idempotent under duplicate delivery\n- **Status polling** by correlation key (`pending` / `paid` / `failed`)\n\nThe result callback endpoint is addressed to the gateway, not to storefront clients; it always acknowledges delivery.",
        license(name = "MIT"),
        contact(name = "Duka Pay", url = "https://github.com/duka-pay/stack")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::payments::initiate_payment,
        crate::routes::payments::gateway_callback,
        crate::routes::payments::payment_status,
    ),
    components(schemas(
        crate::routes::payments::InitiateRequest,
        crate::routes::payments::InitiateResponse,
        crate::routes::payments::CallbackAck,
        crate::routes::payments::StatusResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        duka_core::Order,
        duka_core::LineItem,
        duka_core::Customer,
        duka_store::PaymentState,
    )),
    tags(
        (name = "payments", description = "Payment initiation, gateway result callback, and status polling"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
