//! Best-effort projection of handled events into downstream collaborators.
//!
//! ## Sinks
//!
//! ```text
//! SyncRecord ─┬─▶ CrmClient       (POST {crm}/sales)
//!             └─▶ PurchaseMirror  (POST {mirror}, optional)
//! ```
//!
//! Every sink is attempted once, bounded by a timeout. Failures are logged
//! and never change the answer sent to the webhook sender.

pub mod crm;
pub mod mirror;
pub mod record;
pub mod sink;

pub use crm::{CrmClient, API_KEY_HEADER};
pub use mirror::PurchaseMirror;
pub use record::{Subscriber, SyncRecord, DEFAULT_PRODUCT_NAME, SYNC_SOURCE};
pub use sink::{deliver_best_effort, forward_all, SyncSink};
