//! Error types for webhook ingestion and downstream sync.

use std::time::Duration;

/// Failures that decide the status code returned to the webhook sender.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Signature missing, malformed, stale, or mismatched.
    #[error("webhook signature verification failed")]
    Unauthorized,

    /// Verified body is not a parseable event.
    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures of a single best-effort sync attempt.
///
/// These never reach the webhook sender.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Endpoint or credential missing.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Network or client error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Collaborator answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Call exceeded the configured bound.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
