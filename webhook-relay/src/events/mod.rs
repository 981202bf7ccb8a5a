//! Event model and routing for verified webhook bodies.
//!
//! ## Flow
//!
//! ```text
//! verified bytes → VerifiedEvent::parse() → route() → handled / ignored
//! ```

pub mod router;
pub mod types;

pub use router::{route, Route};
pub use types::{
    CheckoutSession, CustomerDetails, VerifiedEvent, CHECKOUT_SESSION_COMPLETED,
};
