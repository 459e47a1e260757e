//! Fault reporting and the two-tier containment path.

use super::async_event::AsyncEvent;
use crate::events::{ClientErrored, ShardId};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::error;

/// A subscriber failure captured by an [`AsyncEvent`].
#[derive(Debug)]
pub struct HandlerFault {
    /// Kind whose subscriber failed.
    pub event_name: &'static str,
    /// Shard that produced the occurrence, if known.
    pub shard_id: Option<ShardId>,
    /// The occurrence payload, type-erased.
    pub payload: Arc<dyn Any + Send + Sync>,
    pub error: anyhow::Error,
}

/// Where an [`AsyncEvent`] sends subscriber failures.
///
/// A report is awaited before the channel moves on to the next subscriber.
#[async_trait]
pub trait FaultSink: Send + Sync {
    async fn report(&self, fault: HandlerFault);
}

// ---------------------------------------------------------------------------
// Tier 1
// ---------------------------------------------------------------------------

/// Turns subscriber failures into `ClientErrored` occurrences.
///
/// Owns the `ClientErrored` channel. That channel reports its own failures to
/// a [`DoubleFaultGuard`], never back into the funnel.
pub struct ErrorFunnel {
    channel: AsyncEvent<ClientErrored>,
}

impl ErrorFunnel {
    pub fn new(guard: Arc<DoubleFaultGuard>, slow_handler_threshold: Option<Duration>) -> Self {
        Self {
            channel: AsyncEvent::new("ClientErrored", guard)
                .with_slow_handler_threshold(slow_handler_threshold),
        }
    }

    /// The `ClientErrored` subscription point.
    pub fn channel(&self) -> &AsyncEvent<ClientErrored> {
        &self.channel
    }
}

#[async_trait]
impl FaultSink for ErrorFunnel {
    async fn report(&self, fault: HandlerFault) {
        let HandlerFault {
            event_name,
            shard_id,
            payload,
            error,
        } = fault;

        error!(
            event = event_name,
            shard = ?shard_id,
            error = %format!("{error:#}"),
            "Exception occurred while handling {event_name}"
        );

        let errored = ClientErrored {
            event_name,
            error: Arc::new(error),
            shard_id,
            payload: Some(payload),
        };
        self.channel.invoke_from(shard_id, Arc::new(errored)).await;
    }
}

// ---------------------------------------------------------------------------
// Tier 2
// ---------------------------------------------------------------------------

/// Terminal handler for failures of `ClientErrored` subscribers.
///
/// Logs once per failure and counts it. Never dispatches anything.
#[derive(Debug, Default)]
pub struct DoubleFaultGuard {
    count: AtomicU64,
}

impl DoubleFaultGuard {
    /// Number of double faults recorded so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FaultSink for DoubleFaultGuard {
    async fn report(&self, fault: HandlerFault) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // The failed subscriber was handling a ClientErrored; name the original event too.
        let original = fault
            .payload
            .downcast_ref::<ClientErrored>()
            .map(|errored| errored.event_name);

        error!(
            event = fault.event_name,
            original_event = ?original,
            shard = ?fault.shard_id,
            error = %format!("{:#}", fault.error),
            "Exception occurred while handling another exception"
        );
    }
}
