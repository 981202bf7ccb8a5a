//! HTTP client for the CRM/analytics collaborator.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::sync::record::{Subscriber, SyncRecord};
use crate::sync::sink::SyncSink;
use crate::util::redact::{mask_email, preview};

/// Header carrying the CRM API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

const SALES_PATH: &str = "sales";
const SUBSCRIBERS_PATH: &str = "subscribers";

/// Longest response body excerpt kept for logs and errors.
const BODY_PREVIEW_CHARS: usize = 300;

/// CRM client. Cheap to clone; shares the underlying connection pool.
#[derive(Clone)]
pub struct CrmClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl CrmClient {
    /// Create a client for `base_url`, e.g. `https://crm.example.com/api/v1`.
    pub fn new(client: Client, base_url: Url, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Forward a completed sale.
    pub async fn record_sale(&self, record: &SyncRecord) -> SyncResult<()> {
        info!(
            email = %record.email.as_deref().map(mask_email).unwrap_or_default(),
            sale_amount = record.sale_amount,
            currency = %record.currency,
            transaction_id = %record.transaction_id,
            has_referral = record.referral_code.is_some(),
            "crm_sale_forwarding"
        );

        self.post_json(SALES_PATH, record).await
    }

    /// Add a newsletter subscriber.
    pub async fn subscribe(&self, subscriber: &Subscriber) -> SyncResult<()> {
        info!(
            email = %mask_email(&subscriber.email),
            has_referral = subscriber.referral_code.is_some(),
            "crm_subscribe_forwarding"
        );

        self.post_json(SUBSCRIBERS_PATH, subscriber).await
    }

    /// Resolve `path` against the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path)?)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> SyncResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(SyncError::NotConfigured("CRM API key"));
        }

        let url = self.endpoint(path)?;

        let response = match self
            .client
            .post(url.clone())
            .timeout(self.timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(
                        url = %url,
                        timeout_ms = self.timeout.as_millis() as u64,
                        error = %e,
                        "crm_request_timeout"
                    );
                    return Err(SyncError::Timeout(self.timeout));
                }
                error!(url = %url, error = %e, "crm_request_error");
                return Err(SyncError::Request(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(url = %url, status_code = status.as_u16(), "crm_request_complete");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let body = preview(text.as_bytes(), BODY_PREVIEW_CHARS);

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => warn!(
                url = %url,
                status_code = status.as_u16(),
                response = %json,
                "crm_request_rejected"
            ),
            Err(_) => warn!(
                url = %url,
                status_code = status.as_u16(),
                response_preview = %body,
                "crm_request_rejected"
            ),
        }

        Err(SyncError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl SyncSink for CrmClient {
    fn name(&self) -> &'static str {
        "crm"
    }

    fn send<'a>(&'a self, record: &'a SyncRecord) -> BoxFuture<'a, SyncResult<()>> {
        self.record_sale(record).boxed()
    }
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}
