//! Dispatch of verified events to their handlers.

use tracing::info;

use crate::events::types::{CheckoutSession, VerifiedEvent};
use crate::sync::SyncRecord;
use crate::util::redact::mask_email;

/// What the pipeline should do with a verified event.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Acknowledge without further processing.
    Ignore,
    /// Forward the record to the configured sinks.
    Sync(SyncRecord),
}

/// Route a verified event.
///
/// Unknown kinds are ignored rather than rejected: the sender retries any
/// non-2xx answer, and retrying a kind that is deliberately dropped never
/// succeeds.
pub fn route(event: &VerifiedEvent, default_currency: &str) -> Route {
    match event {
        VerifiedEvent::CheckoutCompleted { id, session } => {
            Route::Sync(handle_checkout_completed(id.as_deref(), session, default_currency))
        }
        VerifiedEvent::Unknown { id, kind } => {
            info!(
                event_id = id.as_deref().unwrap_or("unknown"),
                kind = %kind,
                "event_ignored"
            );
            Route::Ignore
        }
    }
}

/// Handler for `checkout.session.completed`.
fn handle_checkout_completed(
    event_id: Option<&str>,
    session: &CheckoutSession,
    default_currency: &str,
) -> SyncRecord {
    info!(
        event_id = event_id.unwrap_or("unknown"),
        session_id = session.id.as_deref().unwrap_or("unknown"),
        email = %session.email().map(mask_email).unwrap_or_default(),
        amount_total = session.amount_total.unwrap_or(0),
        currency = session.currency.as_deref().unwrap_or(default_currency),
        payment_intent = session.payment_intent.as_deref().unwrap_or("none"),
        client_reference_id = session.client_reference_id.as_deref().unwrap_or("none"),
        "checkout_completed_received"
    );

    SyncRecord::from_checkout(session, default_currency)
}
