//! Per-request ingestion pipeline.
//!
//! ```text
//! RECEIVED ─verify✗─▶ Rejected (401)
//! VERIFIED ─parse✗──▶ Malformed (400)
//! PARSED ──unknown──▶ Ignored (200)
//! PARSED ──handled──▶ forward (best-effort) ─▶ Acknowledged (200)
//! ```
//!
//! Steps run strictly in order and nothing is retried here; the sender
//! retries on non-2xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::error::IngestError;
use crate::events::{route, Route, VerifiedEvent};
use crate::sync::forward_all;
use crate::util::redact::preview;
use crate::web::AppState;

/// Longest body excerpt logged for malformed payloads.
const MALFORMED_PREVIEW_CHARS: usize = 200;

/// Terminal state of one webhook request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Signature invalid or missing.
    Rejected,
    /// Verified, but the body is not a parseable event.
    Malformed,
    /// Verified and parsed, but not a kind this service handles.
    Ignored,
    /// Handled. `delivered` counts sinks that accepted the record and does
    /// not affect the response.
    Acknowledged { delivered: usize },
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Rejected => StatusCode::UNAUTHORIZED,
            Outcome::Malformed => StatusCode::BAD_REQUEST,
            Outcome::Ignored | Outcome::Acknowledged { .. } => StatusCode::OK,
        }
    }

    /// Plain-text response body.
    pub fn body(&self) -> &'static str {
        match self {
            Outcome::Rejected => "Unauthorized",
            Outcome::Malformed => "Bad Request",
            Outcome::Ignored | Outcome::Acknowledged { .. } => "OK",
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

/// Verify, parse, route, and forward one webhook.
pub async fn ingest(state: &AppState, signature: Option<&str>, body: &[u8]) -> Outcome {
    let event = match verify_and_parse(state, signature, body) {
        Ok(event) => event,
        Err(IngestError::Unauthorized) => {
            warn!(
                has_signature = signature.is_some(),
                body_length = body.len(),
                "webhook_rejected"
            );
            return Outcome::Rejected;
        }
        Err(IngestError::Malformed(e)) => {
            warn!(
                error = %e,
                body_length = body.len(),
                body_preview = %preview(body, MALFORMED_PREVIEW_CHARS),
                "webhook_malformed"
            );
            return Outcome::Malformed;
        }
    };

    info!(
        event_id = event.id().unwrap_or("unknown"),
        kind = event.kind(),
        handled = event.is_handled(),
        "webhook_verified"
    );

    match route(&event, &state.config.default_currency) {
        Route::Ignore => Outcome::Ignored,
        Route::Sync(record) => {
            let delivered =
                forward_all(&state.sinks, &record, state.config.forward_timeout()).await;
            Outcome::Acknowledged { delivered }
        }
    }
}

/// Signature check strictly before parsing.
fn verify_and_parse(
    state: &AppState,
    signature: Option<&str>,
    body: &[u8],
) -> Result<VerifiedEvent, IngestError> {
    let signature = signature.ok_or(IngestError::Unauthorized)?;

    if !state.verifier.verify(body, signature) {
        return Err(IngestError::Unauthorized);
    }

    Ok(VerifiedEvent::parse(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status_codes() {
        assert_eq!(Outcome::Rejected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Outcome::Malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Outcome::Ignored.status(), StatusCode::OK);
        assert_eq!(Outcome::Acknowledged { delivered: 0 }.status(), StatusCode::OK);
    }

    #[test]
    fn test_outcome_bodies() {
        assert_eq!(Outcome::Rejected.body(), "Unauthorized");
        assert_eq!(Outcome::Malformed.body(), "Bad Request");
        assert_eq!(Outcome::Ignored.body(), "OK");
        assert_eq!(Outcome::Acknowledged { delivered: 2 }.body(), "OK");
    }
}
