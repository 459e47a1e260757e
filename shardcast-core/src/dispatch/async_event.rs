//! Per-kind broadcast channel.
//!
//! [`AsyncEvent`] holds the ordered subscriber list of one event kind and
//! fans every occurrence out to it:
//!
//! - Subscribers run one after another, in registration order.
//! - A failing (or panicking) subscriber does not stop the ones after it; the
//!   failure is handed to the channel's [`FaultSink`] before the next
//!   subscriber starts.
//! - The subscriber list is copy-on-write. An occurrence iterates the snapshot
//!   taken when it started, so `register`/`unregister` never block on or tear
//!   an in-flight fan-out.

use super::fault::{FaultSink, HandlerFault};
use super::handler::Handler;
use crate::events::ShardId;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOutcome {
    /// Subscribers that were invoked.
    pub invoked: usize,
    /// Subscribers that failed; each produced exactly one fault report.
    pub faulted: usize,
}

impl InvokeOutcome {
    pub fn is_success(&self) -> bool {
        self.faulted == 0
    }
}

/// Broadcast channel for payloads of type `T`.
pub struct AsyncEvent<T> {
    name: &'static str,
    handlers: RwLock<Arc<[Handler<T>]>>,
    faults: Arc<dyn FaultSink>,
    slow_handler_threshold: Option<Duration>,
}

impl<T: Send + Sync + 'static> AsyncEvent<T> {
    /// Create an empty channel named `name` that reports failures to `faults`.
    pub fn new(name: &'static str, faults: Arc<dyn FaultSink>) -> Self {
        Self {
            name,
            handlers: RwLock::new(Arc::from(Vec::new())),
            faults,
            slow_handler_threshold: None,
        }
    }

    /// Warn when a single subscriber takes longer than `threshold`.
    pub fn with_slow_handler_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_handler_threshold = threshold;
        self
    }

    /// Name of the event kind this channel carries.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append `handler` to the subscriber list.
    ///
    /// Registering the same handler twice makes it run twice per occurrence.
    pub fn register(&self, handler: &Handler<T>) {
        let mut guard = self.handlers.write();
        let mut next = guard.to_vec();
        next.push(handler.clone());
        *guard = next.into();
    }

    /// Build a handler from `f`, register it, and return it for later removal.
    pub fn subscribe<F, Fut>(&self, f: F) -> Handler<T>
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler = Handler::new(f);
        self.register(&handler);
        handler
    }

    /// Remove the first registration of `handler`.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&self, handler: &Handler<T>) -> bool {
        let mut guard = self.handlers.write();
        let Some(index) = guard.iter().position(|h| h == handler) else {
            return false;
        };
        let mut next = guard.to_vec();
        next.remove(index);
        *guard = next.into();
        true
    }

    /// Drop every registration.
    pub fn clear(&self) {
        *self.handlers.write() = Arc::from(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Fan `payload` out with no shard context.
    pub async fn invoke(&self, payload: T) -> InvokeOutcome {
        self.invoke_from(None, Arc::new(payload)).await
    }

    /// Fan `payload` out to every subscriber registered when this call starts.
    ///
    /// `shard` is only carried into fault reports.
    pub async fn invoke_from(&self, shard: Option<ShardId>, payload: Arc<T>) -> InvokeOutcome {
        let snapshot = self.snapshot();
        let mut outcome = InvokeOutcome::default();

        for handler in snapshot.iter() {
            outcome.invoked += 1;
            let started = Instant::now();
            let call = AssertUnwindSafe(async { handler.call(Arc::clone(&payload)).await });
            let result = call.catch_unwind().await;
            self.check_slow(started, shard);

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => anyhow::anyhow!("handler panicked: {}", panic_message(&*panic)),
            };

            outcome.faulted += 1;
            let erased: Arc<dyn Any + Send + Sync> = payload.clone();
            self.faults
                .report(HandlerFault {
                    event_name: self.name,
                    shard_id: shard,
                    payload: erased,
                    error,
                })
                .await;
        }

        if outcome.invoked > 0 {
            debug!(
                event = self.name,
                shard = ?shard,
                invoked = outcome.invoked,
                faulted = outcome.faulted,
                "Fan-out complete"
            );
        }
        outcome
    }

    fn snapshot(&self) -> Arc<[Handler<T>]> {
        Arc::clone(&self.handlers.read())
    }

    fn check_slow(&self, started: Instant, shard: Option<ShardId>) {
        let Some(threshold) = self.slow_handler_threshold else {
            return;
        };
        let elapsed = started.elapsed();
        if elapsed > threshold {
            warn!(
                event = self.name,
                shard = ?shard,
                elapsed_ms = elapsed.as_millis() as u64,
                "Subscriber took longer than the slow-handler threshold"
            );
        }
    }
}

impl<T> fmt::Debug for AsyncEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncEvent")
            .field("name", &self.name)
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
