//! Configuration module for environment variable parsing.
//!
//! All values are read once at startup and passed into [`crate::AppState`];
//! nothing in the request path reads the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Currency used when a checkout event carries none.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret used to verify `Stripe-Signature` headers
    pub stripe_webhook_secret: Option<String>,

    /// Maximum distance in seconds between the signed timestamp and now.
    /// `None` disables the replay window.
    pub signature_tolerance_secs: Option<u64>,

    /// Base URL of the CRM collaborator (`/sales`, `/subscribers`)
    pub crm_api_url: Option<Url>,

    /// API key sent to the CRM in the `X-Api-Key` header
    pub crm_api_key: Option<String>,

    /// Optional table endpoint mirroring purchases into the data store
    pub mirror_url: Option<Url>,

    /// Key for the purchase mirror endpoint
    pub mirror_api_key: Option<String>,

    /// Upper bound for each outbound forwarding call, in milliseconds
    pub forward_timeout_ms: u64,

    /// Currency applied to checkout events without one
    pub default_currency: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_number("PORT", 8080),

            stripe_webhook_secret: parse_secret("STRIPE_WEBHOOK_SECRET"),

            signature_tolerance_secs: match parse_number("SIGNATURE_TOLERANCE_SECS", 300u64) {
                0 => None,
                secs => Some(secs),
            },

            crm_api_url: parse_url("CRM_API_URL"),

            crm_api_key: parse_secret("CRM_API_KEY"),

            mirror_url: parse_url("MIRROR_URL"),

            mirror_api_key: parse_secret("MIRROR_API_KEY"),

            forward_timeout_ms: parse_forward_timeout("FORWARD_TIMEOUT_MS", 5000),

            default_currency: parse_currency("DEFAULT_CURRENCY", DEFAULT_CURRENCY),
        }
    }

    /// Replay window for signed webhook timestamps.
    pub fn signature_tolerance(&self) -> Option<Duration> {
        self.signature_tolerance_secs.map(Duration::from_secs)
    }

    /// Bound applied to each outbound forwarding call.
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    /// Whether sales can be forwarded to the CRM.
    ///
    /// Both the endpoint and the key are required; the call is never sent
    /// unauthenticated.
    pub fn crm_enabled(&self) -> bool {
        self.crm_api_url.is_some() && self.crm_api_key.is_some()
    }

    /// Whether purchases are mirrored into the data store.
    pub fn mirror_enabled(&self) -> bool {
        self.mirror_url.is_some() && self.mirror_api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            stripe_webhook_secret: None,
            signature_tolerance_secs: Some(300),
            crm_api_url: None,
            crm_api_key: None,
            mirror_url: None,
            mirror_api_key: None,
            forward_timeout_ms: 5000,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("stripe_webhook_secret", &redact(&self.stripe_webhook_secret))
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("crm_api_url", &self.crm_api_url.as_ref().map(Url::as_str))
            .field("crm_api_key", &redact(&self.crm_api_key))
            .field("mirror_url", &self.mirror_url.as_ref().map(Url::as_str))
            .field("mirror_api_key", &redact(&self.mirror_api_key))
            .field("forward_timeout_ms", &self.forward_timeout_ms)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[REDACTED]")
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_number<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + fmt::Display,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, default = %default, "Invalid number, using default");
            default
        }
    }
}

/// Forward timeout in milliseconds. Zero would time out every call, so it is
/// replaced with the default.
fn parse_forward_timeout(name: &str, default: u64) -> u64 {
    match parse_number(name, default) {
        0 => {
            warn!(env_var = name, default = default, "Zero timeout, using default");
            default
        }
        ms => ms,
    }
}

/// Three-letter currency code, uppercased.
fn parse_currency(name: &str, default: &str) -> String {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default.to_string(),
    };

    let code = raw.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        code
    } else {
        warn!(env_var = name, value = %raw, default = default, "Invalid currency code, using default");
        default.to_string()
    }
}

/// Read a secret, treating blank values as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an absolute http(s) URL.
fn parse_url(name: &str) -> Option<Url> {
    let raw = parse_secret(name)?;

    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            warn!(env_var = name, scheme = url.scheme(), "Unsupported URL scheme, ignoring");
            None
        }
        Err(e) => {
            warn!(env_var = name, error = %e, "Invalid URL, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secret_blank_is_none() {
        env::set_var("TEST_RELAY_SECRET_BLANK", "   ");
        assert_eq!(parse_secret("TEST_RELAY_SECRET_BLANK"), None);
        env::remove_var("TEST_RELAY_SECRET_BLANK");
    }

    #[test]
    fn test_parse_secret_trims() {
        env::set_var("TEST_RELAY_SECRET", " whsec_abc ");
        assert_eq!(parse_secret("TEST_RELAY_SECRET"), Some("whsec_abc".to_string()));
        env::remove_var("TEST_RELAY_SECRET");
    }

    #[test]
    fn test_parse_url_valid() {
        env::set_var("TEST_RELAY_URL", "https://crm.example.com/api/");
        let url = parse_url("TEST_RELAY_URL").unwrap();
        assert_eq!(url.host_str(), Some("crm.example.com"));
        env::remove_var("TEST_RELAY_URL");
    }

    #[test]
    fn test_parse_url_rejects_garbage_and_scheme() {
        env::set_var("TEST_RELAY_URL_BAD", "not a url");
        assert!(parse_url("TEST_RELAY_URL_BAD").is_none());
        env::set_var("TEST_RELAY_URL_BAD", "ftp://crm.example.com");
        assert!(parse_url("TEST_RELAY_URL_BAD").is_none());
        env::remove_var("TEST_RELAY_URL_BAD");
    }

    #[test]
    fn test_parse_number_valid_and_invalid() {
        env::set_var("TEST_RELAY_NUMBER", " 9090 ");
        assert_eq!(parse_number("TEST_RELAY_NUMBER", 8080u16), 9090);

        env::set_var("TEST_RELAY_NUMBER", "eighty");
        assert_eq!(parse_number("TEST_RELAY_NUMBER", 8080u16), 8080);

        env::set_var("TEST_RELAY_NUMBER", "70000");
        assert_eq!(parse_number("TEST_RELAY_NUMBER", 8080u16), 8080);
        env::remove_var("TEST_RELAY_NUMBER");

        assert_eq!(parse_number("NONEXISTENT_RELAY_NUMBER", 300u64), 300);
    }

    #[test]
    fn test_parse_forward_timeout_rejects_zero() {
        env::set_var("TEST_RELAY_TIMEOUT", "0");
        assert_eq!(parse_forward_timeout("TEST_RELAY_TIMEOUT", 5000), 5000);

        env::set_var("TEST_RELAY_TIMEOUT", "250");
        assert_eq!(parse_forward_timeout("TEST_RELAY_TIMEOUT", 5000), 250);

        env::set_var("TEST_RELAY_TIMEOUT", "-1");
        assert_eq!(parse_forward_timeout("TEST_RELAY_TIMEOUT", 5000), 5000);
        env::remove_var("TEST_RELAY_TIMEOUT");
    }

    #[test]
    fn test_parse_currency() {
        env::set_var("TEST_RELAY_CURRENCY", " eur ");
        assert_eq!(parse_currency("TEST_RELAY_CURRENCY", "USD"), "EUR");

        env::set_var("TEST_RELAY_CURRENCY", "euro");
        assert_eq!(parse_currency("TEST_RELAY_CURRENCY", "USD"), "USD");

        env::set_var("TEST_RELAY_CURRENCY", "E1R");
        assert_eq!(parse_currency("TEST_RELAY_CURRENCY", "USD"), "USD");
        env::remove_var("TEST_RELAY_CURRENCY");

        assert_eq!(parse_currency("NONEXISTENT_RELAY_CURRENCY", "USD"), "USD");
    }

    #[test]
    fn test_crm_requires_url_and_key() {
        let mut config = Config::default();
        assert!(!config.crm_enabled());

        config.crm_api_url = Url::parse("https://crm.example.com").ok();
        assert!(!config.crm_enabled());

        config.crm_api_key = Some("key".to_string());
        assert!(config.crm_enabled());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            stripe_webhook_secret: Some("whsec_supersecret".to_string()),
            crm_api_key: Some("crm_supersecret".to_string()),
            ..Config::default()
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
