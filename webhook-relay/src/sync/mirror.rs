//! Optional mirror of sales into the data store's REST table endpoint.
//!
//! The primary interaction with the sender is already complete by the time
//! this runs, so a failed insert is logged and dropped like any other sink.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::sync::record::SyncRecord;
use crate::sync::sink::SyncSink;
use crate::util::redact::preview;

/// PostgREST-style insert into a purchases table.
#[derive(Clone)]
pub struct PurchaseMirror {
    client: Client,
    table_url: Url,
    api_key: String,
    timeout: Duration,
}

impl PurchaseMirror {
    pub fn new(client: Client, table_url: Url, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            table_url,
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Insert one row.
    pub async fn insert(&self, record: &SyncRecord) -> SyncResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(SyncError::NotConfigured("mirror API key"));
        }

        let response = self
            .client
            .post(self.table_url.clone())
            .timeout(self.timeout)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(self.timeout)
                } else {
                    SyncError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = preview(text.as_bytes(), 300);
            warn!(
                status_code = status.as_u16(),
                response_preview = %body,
                "mirror_insert_rejected"
            );
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            transaction_id = %record.transaction_id,
            status_code = status.as_u16(),
            "mirror_insert_complete"
        );

        Ok(())
    }
}

impl SyncSink for PurchaseMirror {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn send<'a>(&'a self, record: &'a SyncRecord) -> BoxFuture<'a, SyncResult<()>> {
        self.insert(record).boxed()
    }
}

impl std::fmt::Debug for PurchaseMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseMirror")
            .field("table_url", &self.table_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
