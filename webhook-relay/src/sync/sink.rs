//! Sink abstraction and the catch-log-discard delivery wrapper.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{error, info};

use crate::error::{SyncError, SyncResult};
use crate::sync::record::SyncRecord;

/// A downstream collaborator that accepts sale records.
pub trait SyncSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Send one record. A single attempt; callers own timeouts.
    fn send<'a>(&'a self, record: &'a SyncRecord) -> BoxFuture<'a, SyncResult<()>>;
}

/// Deliver a record to one sink, observing but never propagating failures.
///
/// Returns whether the sink accepted the record; the value is only meant for
/// logging and metrics.
pub async fn deliver_best_effort(sink: &dyn SyncSink, record: &SyncRecord, timeout: Duration) -> bool {
    let outcome = match tokio::time::timeout(timeout, sink.send(record)).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout(timeout)),
    };

    match outcome {
        Ok(()) => {
            info!(
                sink = sink.name(),
                transaction_id = %record.transaction_id,
                "sync_delivered"
            );
            true
        }
        Err(SyncError::Timeout(after)) => {
            error!(
                sink = sink.name(),
                transaction_id = %record.transaction_id,
                timeout_ms = after.as_millis() as u64,
                "sync_timeout"
            );
            false
        }
        Err(e) => {
            error!(
                sink = sink.name(),
                transaction_id = %record.transaction_id,
                error = %e,
                "sync_failed"
            );
            false
        }
    }
}

/// Deliver a record to every sink concurrently.
///
/// Returns the number of sinks that accepted it.
pub async fn forward_all(sinks: &[Arc<dyn SyncSink>], record: &SyncRecord, timeout: Duration) -> usize {
    if sinks.is_empty() {
        info!(transaction_id = %record.transaction_id, "sync_skipped_no_sinks");
        return 0;
    }

    let deliveries: Vec<_> = sinks
        .iter()
        .map(|sink| deliver_best_effort(sink.as_ref(), record, timeout))
        .collect();

    let results = futures::future::join_all(deliveries).await;
    let delivered = results.iter().filter(|&&ok| ok).count();

    info!(
        transaction_id = %record.transaction_id,
        sinks = sinks.len(),
        delivered = delivered,
        "sync_complete"
    );

    delivered
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;
    use crate::events::CheckoutSession;

    struct CountingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SyncSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn send<'a>(&'a self, _record: &'a SyncRecord) -> BoxFuture<'a, SyncResult<()>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            async move {
                if fail {
                    Err(SyncError::Status {
                        status: 500,
                        body: "boom".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    struct StalledSink;

    impl SyncSink for StalledSink {
        fn name(&self) -> &'static str {
            "stalled"
        }

        fn send<'a>(&'a self, _record: &'a SyncRecord) -> BoxFuture<'a, SyncResult<()>> {
            futures::future::pending::<SyncResult<()>>().boxed()
        }
    }

    fn record() -> SyncRecord {
        SyncRecord::from_checkout(&CheckoutSession::default(), "USD")
    }

    #[tokio::test]
    async fn test_deliver_success() {
        let sink = CountingSink {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        assert!(deliver_best_effort(&sink, &record(), Duration::from_secs(1)).await);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deliver_failure_is_contained() {
        let sink = CountingSink {
            calls: AtomicUsize::new(0),
            fail: true,
        };

        assert!(!deliver_best_effort(&sink, &record(), Duration::from_secs(1)).await);
        // single attempt, no retry
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deliver_timeout_is_contained() {
        let delivered =
            deliver_best_effort(&StalledSink, &record(), Duration::from_millis(20)).await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_forward_all_counts_successes() {
        let sinks: Vec<Arc<dyn SyncSink>> = vec![
            Arc::new(CountingSink {
                calls: AtomicUsize::new(0),
                fail: false,
            }),
            Arc::new(CountingSink {
                calls: AtomicUsize::new(0),
                fail: true,
            }),
            Arc::new(StalledSink),
        ];

        let delivered = forward_all(&sinks, &record(), Duration::from_millis(20)).await;
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_forward_all_without_sinks() {
        assert_eq!(forward_all(&[], &record(), Duration::from_secs(1)).await, 0);
    }
}
