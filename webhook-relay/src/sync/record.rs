//! Records sent to the CRM collaborator.

use serde::{Deserialize, Serialize};

use crate::events::CheckoutSession;

/// Source label attached to every forwarded sale.
pub const SYNC_SOURCE: &str = "stripe";

/// Product label used when the checkout carries none.
pub const DEFAULT_PRODUCT_NAME: &str = "Course";

/// Metadata keys carrying the product label, in priority order.
const PRODUCT_METADATA_KEYS: &[&str] = &["product_name", "product"];

/// Metadata keys carrying an attribution/referral code, in priority order.
/// `client_reference_id` is used when none is present.
const REFERRAL_METADATA_KEYS: &[&str] = &["referral", "ref"];

/// Normalised sale record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub email: Option<String>,
    /// First whitespace-delimited token of the customer's name
    pub first_name: Option<String>,
    pub source: String,
    /// Amount in major units (2000 cents becomes 20.0)
    pub sale_amount: f64,
    /// Uppercase ISO 4217 code
    pub currency: String,
    pub product_name: String,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

impl SyncRecord {
    /// Project a checkout session into a sale record.
    pub fn from_checkout(session: &CheckoutSession, default_currency: &str) -> Self {
        let currency = session
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_currency)
            .to_uppercase();

        let transaction_id = session
            .payment_intent
            .as_deref()
            .or(session.id.as_deref())
            .unwrap_or_default()
            .to_string();

        SyncRecord {
            email: session.email().map(str::to_string),
            first_name: session.name().and_then(first_name),
            source: SYNC_SOURCE.to_string(),
            sale_amount: minor_to_major(session.amount_total.unwrap_or(0)),
            currency,
            product_name: session
                .metadata_value(PRODUCT_METADATA_KEYS)
                .unwrap_or(DEFAULT_PRODUCT_NAME)
                .to_string(),
            transaction_id,
            referral_code: session
                .metadata_value(REFERRAL_METADATA_KEYS)
                .or_else(|| {
                    session
                        .client_reference_id
                        .as_deref()
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                })
                .map(str::to_string),
        }
    }
}

/// Newsletter subscriber forwarded by the subscription proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

/// First whitespace-delimited token of a display name.
fn first_name(name: &str) -> Option<String> {
    name.split_whitespace().next().map(str::to_string)
}

/// Convert minor units (cents) to major units.
fn minor_to_major(amount: i64) -> f64 {
    amount as f64 / 100.0
}
