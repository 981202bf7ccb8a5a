//! Web server module.
//!
//! This module provides the HTTP surface:
//! - `POST /webhooks/stripe`: signed payment webhooks
//! - `POST /subscribe`: newsletter signup proxy to the CRM
//! - `GET /health`: liveness

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, stripe_webhook, subscribe, AppState, HealthResponse, SubscribeRequest,
    SubscribeResponse,
};
pub use signature::{
    constant_time_compare, sign_payload, verify_signature, SignatureToken, SignatureVerifier,
    SIGNATURE_HEADER,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/subscribe", post(subscribe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
