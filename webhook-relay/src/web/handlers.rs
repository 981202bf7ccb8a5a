//! HTTP endpoint handlers.
//!
//! The webhook handler only extracts the raw body and signature header and
//! hands both to [`crate::pipeline::ingest`]; the body is never re-serialised
//! before verification.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::pipeline::{ingest, Outcome};
use crate::sync::{CrmClient, PurchaseMirror, Subscriber, SyncSink};
use crate::util::redact::mask_email;
use crate::web::signature::{SignatureVerifier, SIGNATURE_HEADER};
use crate::Config;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: SignatureVerifier,
    /// Destinations for handled sales
    pub sinks: Arc<Vec<Arc<dyn SyncSink>>>,
    /// CRM used by the subscription proxy
    pub crm: Option<CrmClient>,
}

impl AppState {
    /// Assemble state from explicit parts.
    pub fn new(config: Config, sinks: Vec<Arc<dyn SyncSink>>, crm: Option<CrmClient>) -> Self {
        let verifier = SignatureVerifier::new(
            config.stripe_webhook_secret.clone().unwrap_or_default(),
            config.signature_tolerance(),
        );

        Self {
            config: Arc::new(config),
            verifier,
            sinks: Arc::new(sinks),
            crm,
        }
    }

    /// Build the HTTP clients and sinks described by `config`.
    ///
    /// Sinks whose endpoint or key is missing are left out, so no call is
    /// ever sent unauthenticated.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.forward_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let crm = match (&config.crm_api_url, &config.crm_api_key) {
            (Some(url), Some(key)) => Some(CrmClient::new(
                client.clone(),
                url.clone(),
                key.clone(),
                config.forward_timeout(),
            )),
            _ => {
                warn!("crm_forwarding_disabled");
                None
            }
        };

        let mut sinks: Vec<Arc<dyn SyncSink>> = Vec::new();
        if let Some(crm) = &crm {
            sinks.push(Arc::new(crm.clone()));
        }
        if let (Some(url), Some(key)) = (&config.mirror_url, &config.mirror_api_key) {
            sinks.push(Arc::new(PurchaseMirror::new(
                client.clone(),
                url.clone(),
                key.clone(),
                config.forward_timeout(),
            )));
        }

        let state = Self::new(config, sinks, crm);

        if !state.verifier.is_configured() {
            warn!("stripe_webhook_secret_missing");
        }

        Ok(state)
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Stripe webhook endpoint.
///
/// 401 on signature failure, 400 on an unparseable body, 200 "OK" otherwise,
/// whatever happens to downstream sync.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Outcome {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "stripe_webhook_received"
    );

    let outcome = ingest(&state, signature, &body).await;

    info!(
        status_code = outcome.status().as_u16(),
        outcome = ?outcome,
        "stripe_webhook_complete"
    );

    outcome
}

// =============================================================================
// Subscription Proxy
// =============================================================================

/// Newsletter signup request.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Subscription proxy response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub status: String,
}

impl SubscribeResponse {
    fn reply(status: StatusCode, label: &str) -> (StatusCode, Json<SubscribeResponse>) {
        (
            status,
            Json(SubscribeResponse {
                status: label.to_string(),
            }),
        )
    }
}

/// Email subscription proxy endpoint.
///
/// Forwards the subscriber to the CRM with the server-side API key, so the
/// key never reaches the browser.
pub async fn subscribe(
    State(state): State<AppState>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> (StatusCode, Json<SubscribeResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                status_code = rejection.status().as_u16(),
                error = %rejection.body_text(),
                "subscribe_invalid_body"
            );
            return SubscribeResponse::reply(StatusCode::BAD_REQUEST, "invalid_email");
        }
    };

    let email = request.email.trim().to_lowercase();

    if !is_plausible_email(&email) {
        warn!(email_length = email.len(), "subscribe_invalid_email");
        return SubscribeResponse::reply(StatusCode::BAD_REQUEST, "invalid_email");
    }

    let Some(crm) = state.crm.as_ref() else {
        warn!("subscribe_crm_not_configured");
        return SubscribeResponse::reply(StatusCode::SERVICE_UNAVAILABLE, "unavailable");
    };

    let subscriber = Subscriber {
        email,
        first_name: request
            .first_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        referral_code: request
            .referral_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };

    if let Err(e) = crm.subscribe(&subscriber).await {
        error!(
            email = %mask_email(&subscriber.email),
            error = %e,
            "subscribe_forward_failed"
        );
        return SubscribeResponse::reply(StatusCode::BAD_GATEWAY, "error");
    }

    info!(email = %mask_email(&subscriber.email), "subscribe_complete");

    SubscribeResponse::reply(StatusCode::OK, "subscribed")
}

/// Cheap shape check: one `@`, non-empty local part, dotted domain.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
