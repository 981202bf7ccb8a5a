//! Stripe-style webhook signature verification.
//!
//! The sender signs `{timestamp}.{raw_body}` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<unix seconds>,v1=<lowercase hex>`.
//! Reference: https://docs.stripe.com/webhooks#verify-manually

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Timestamp and hash candidates extracted from a signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureToken {
    pub timestamp: String,
    /// Every non-empty `v1` value, in header order
    pub signatures: Vec<String>,
}

impl SignatureToken {
    /// Parse `t=...,v1=...[,v1=...]`.
    ///
    /// Unknown keys (e.g. `v0`) are skipped. Returns `None` unless both a
    /// non-empty `t` and at least one non-empty `v1` are present.
    pub fn parse(header: &str) -> Option<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "t" => timestamp = Some(value.to_string()),
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Some(Self {
                timestamp,
                signatures,
            }),
            _ => None,
        }
    }
}

/// Compute the lowercase hex HMAC-SHA256 of `{timestamp}.{body}`.
///
/// The body must be the exact bytes received; re-serialising parsed JSON
/// changes them.
pub fn sign_payload(secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header against a raw body.
///
/// Pure function of its inputs; any malformed input is simply "not verified".
/// An empty secret never verifies anything.
pub fn verify_signature(body: &[u8], header: &str, secret: &str) -> bool {
    if secret.is_empty() || header.trim().is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_header = !header.trim().is_empty(),
            "stripe_signature_missing_fields"
        );
        return false;
    }

    let Some(token) = SignatureToken::parse(header) else {
        warn!(header_length = header.len(), "stripe_signature_malformed_header");
        return false;
    };

    matches_token(body, &token, secret)
}

fn matches_token(body: &[u8], token: &SignatureToken, secret: &str) -> bool {
    let Some(expected) = sign_payload(secret, &token.timestamp, body) else {
        warn!("stripe_signature_invalid_key");
        return false;
    };

    // Secret rotation sends one v1 per active secret; any may match.
    let valid = token
        .signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate));

    if !valid {
        warn!(
            expected_length = expected.len(),
            candidates = token.signatures.len(),
            "stripe_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
///
/// A length mismatch returns early (length is not secret); otherwise every
/// position is visited.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    constant_time_compare_with(a, b, |_| {})
}

/// [`constant_time_compare`] reporting each compared position to `on_step`.
pub fn constant_time_compare_with<F: FnMut(usize)>(a: &str, b: &str, mut on_step: F) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (i, (x, y)) in a.bytes().zip(b.bytes()).enumerate() {
        on_step(i);
        result |= x ^ y;
    }
    result == 0
}

/// Signature verifier with a replay window.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Option<Duration>,
}

impl SignatureVerifier {
    /// Create a verifier. `tolerance = None` disables the replay window.
    pub fn new(secret: impl Into<String>, tolerance: Option<Duration>) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Whether a usable secret is configured.
    pub fn is_configured(&self) -> bool {
        !self.secret.trim().is_empty()
    }

    /// Verify against the current system time.
    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.verify_at(body, header, now)
    }

    /// Verify as of `now` (unix seconds).
    pub fn verify_at(&self, body: &[u8], header: &str, now: u64) -> bool {
        if let Some(tolerance) = self.tolerance {
            let Some(token) = SignatureToken::parse(header) else {
                return verify_signature(body, header, &self.secret);
            };

            let signed_at: u64 = match token.timestamp.parse() {
                Ok(t) => t,
                Err(_) => {
                    warn!(timestamp = %token.timestamp, "stripe_signature_invalid_timestamp");
                    return false;
                }
            };

            let age = now.abs_diff(signed_at);
            if age > tolerance.as_secs() {
                warn!(
                    signed_at = signed_at,
                    current_time = now,
                    age_seconds = age,
                    max_age_seconds = tolerance.as_secs(),
                    "stripe_signature_stale"
                );
                return false;
            }
        }

        verify_signature(body, header, &self.secret)
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}
