//! Typed view of a verified webhook body.
//!
//! The body is modelled as a variant keyed by its `type` discriminator. Only
//! kinds this service acts on get a typed payload; everything else is kept as
//! [`VerifiedEvent::Unknown`] so it can be acknowledged and dropped.

use std::collections::HashMap;

use serde::{de::Error as _, Deserialize, Serialize};
use serde_json::Value;

/// Discriminator of the one handled event kind.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Envelope shared by every event kind.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

/// `data` wrapper holding the kind-specific object.
#[derive(Debug, Deserialize)]
struct EventData<T> {
    object: T,
}

/// A parsed webhook event. Only constructed from an already verified body.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifiedEvent {
    /// A completed checkout session.
    CheckoutCompleted {
        /// Sender-assigned event id, used for log correlation
        id: Option<String>,
        session: CheckoutSession,
    },
    /// Any kind this service does not act on.
    Unknown {
        id: Option<String>,
        kind: String,
    },
}

impl VerifiedEvent {
    /// Parse raw body bytes.
    ///
    /// Fails on invalid JSON, a missing `type`, or a handled kind whose
    /// `data.object` is absent or has the wrong shape. The payload of unknown
    /// kinds is never inspected.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(raw)?;

        if envelope.kind != CHECKOUT_SESSION_COMPLETED {
            return Ok(VerifiedEvent::Unknown {
                id: envelope.id,
                kind: envelope.kind,
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| serde_json::Error::missing_field("data"))?;
        let data: EventData<CheckoutSession> = serde_json::from_value(data)?;

        Ok(VerifiedEvent::CheckoutCompleted {
            id: envelope.id,
            session: data.object,
        })
    }

    /// The `type` discriminator.
    pub fn kind(&self) -> &str {
        match self {
            VerifiedEvent::CheckoutCompleted { .. } => CHECKOUT_SESSION_COMPLETED,
            VerifiedEvent::Unknown { kind, .. } => kind,
        }
    }

    /// The sender-assigned event id, if present.
    pub fn id(&self) -> Option<&str> {
        match self {
            VerifiedEvent::CheckoutCompleted { id, .. } | VerifiedEvent::Unknown { id, .. } => {
                id.as_deref()
            }
        }
    }

    /// Whether this kind is acted on.
    pub fn is_handled(&self) -> bool {
        !matches!(self, VerifiedEvent::Unknown { .. })
    }
}

/// Checkout session object (`data.object` of `checkout.session.completed`).
///
/// Every field is optional; the sync projection applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    /// Email entered at checkout
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Details collected by the hosted checkout page
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Total in minor units (e.g. cents)
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Lowercase ISO currency code
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    /// Primary email, falling back to the one in `customer_details`.
    pub fn email(&self) -> Option<&str> {
        non_empty(self.customer_email.as_deref()).or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|d| non_empty(d.email.as_deref()))
        })
    }

    /// Display name from `customer_details`.
    pub fn name(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| non_empty(d.name.as_deref()))
    }

    /// Non-empty metadata value for the first key present.
    pub fn metadata_value(&self, keys: &[&str]) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        keys.iter()
            .find_map(|key| non_empty(metadata.get(*key).map(String::as_str)))
    }
}

/// `customer_details` of a checkout session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
