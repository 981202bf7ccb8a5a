//! Webhook relay - signed payment webhooks in, best-effort CRM sync out.
//!
//! The `relay-web` binary serves the router built by [`web::router`].
//!
//! ## Architecture
//!
//! ```text
//! Stripe → /webhooks/stripe → verify → parse → route → sync sinks (CRM, mirror)
//! Browser → /subscribe → CRM
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod sync;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{IngestError, SyncError, SyncResult};
pub use events::{CheckoutSession, VerifiedEvent};
pub use pipeline::{ingest, Outcome};
pub use sync::{CrmClient, PurchaseMirror, Subscriber, SyncRecord, SyncSink};
pub use web::{router, AppState};
