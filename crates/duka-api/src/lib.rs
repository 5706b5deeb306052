//! # duka-api — Axum API for Duka Pay
//!
//! The HTTP edge of the checkout payment pipeline:
//!
//! | Route                       | Module                 | Caller        |
//! |-----------------------------|------------------------|---------------|
//! | `POST /v1/payments/initiate` | [`routes::payments`]  | storefront    |
//! | `POST /v1/payments/callback` | [`routes::payments`]  | gateway       |
//! | `GET /v1/payments/status`    | [`routes::payments`]  | storefront    |
//! | `GET /openapi.json`          | [`openapi`]           | integrators   |
//! | `GET /health/*`              | [`app`]               | orchestration |
//!
//! Auto-generated OpenAPI spec via utoipa derive macros at `/openapi.json`.

pub mod callback;
pub mod config;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use duka_store::CorrelationStore;

use crate::state::AppState;

/// Assemble the full application router.
///
/// Health probes (`/health/*`) are mounted alongside the API routes; there
/// is no authentication layer — the initiate/status surface is the public
/// checkout edge, and the callback endpoint's contract with the gateway is
/// structural validation plus unconditional acknowledgement.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::payments::router())
        .merge(openapi::router())
        // Body size limit: 1 MiB. Checkout orders and gateway callbacks are
        // small; anything larger is noise.
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe — process is up and the runtime is responsive.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the correlation store answers a point
/// lookup.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let Ok(key) = duka_core::CorrelationKey::new("readiness-probe") else {
        return (StatusCode::SERVICE_UNAVAILABLE, "probe key invalid").into_response();
    };
    match state.store.status(&key).await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "store degraded").into_response(),
    }
}
