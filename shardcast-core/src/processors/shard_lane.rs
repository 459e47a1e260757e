//! ShardLane processor.
//!
//! The ShardLane is responsible for:
//! - Receiving one shard's occurrences from its hand-off channel
//! - Resolving each one to its event kind, in arrival order
//! - Queueing it on that kind's worker, spawned on first use
//! - Draining every queue when shutdown is signaled
//!
//! Each (shard, kind) pair has its own worker, so occurrences of one kind
//! from one shard are delivered in order. A subscriber that hangs stalls only
//! its own kind on its own shard; other kinds and other shards keep flowing.

use crate::events::{Event, EventKind, Occurrence, OccurrenceReceiver, ShardId};
use crate::router::ShardRouter;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Per-shard dispatch worker.
///
/// Like the other processors, the shutdown and event receivers are injected
/// when calling [`run()`](ShardLane::run) rather than owned by the struct.
pub struct ShardLane {
    shard: ShardId,
    router: ShardRouter,
}

impl ShardLane {
    pub fn new(shard: ShardId, router: ShardRouter) -> Self {
        Self { shard, router }
    }

    /// Run the lane until shutdown is signaled or every sender is dropped.
    ///
    /// Returns once every kind worker has routed its backlog.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut event_rx: OccurrenceReceiver) {
        info!(shard = %self.shard, "ShardLane started");
        let mut queues = KindQueues::new(self.shard, self.router);
        let mut received: u64 = 0;

        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!(shard = %self.shard, "ShardLane received shutdown signal");
                        break;
                    }
                }

                next = event_rx.recv() => {
                    let Some(occurrence) = next else {
                        // All senders dropped.
                        info!(shard = %self.shard, "Occurrence channel closed");
                        break;
                    };
                    queues.dispatch(occurrence);
                    received += 1;
                }
            }
        }

        // Nothing that was handed off may be lost: queue the backlog first.
        event_rx.close();
        while let Ok(occurrence) = event_rx.try_recv() {
            queues.dispatch(occurrence);
            received += 1;
        }

        let routed = queues.finish().await;
        info!(shard = %self.shard, received, routed, "ShardLane shutdown complete");
    }
}

/// One FIFO queue and worker task per event kind seen on a shard.
struct KindQueues {
    shard: ShardId,
    router: ShardRouter,
    senders: HashMap<EventKind, mpsc::UnboundedSender<Event>>,
    workers: JoinSet<(EventKind, u64)>,
}

impl KindQueues {
    fn new(shard: ShardId, router: ShardRouter) -> Self {
        Self {
            shard,
            router,
            senders: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    fn dispatch(&mut self, occurrence: Occurrence) {
        let event = ShardRouter::resolve_occurrence(self.shard, occurrence);
        let kind = event.kind();

        let sender = match self.senders.entry(kind) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.workers
                    .spawn(kind_worker(self.shard, kind, self.router.clone(), rx));
                debug!(shard = %self.shard, event = %kind, "Kind worker started");
                entry.insert(tx)
            }
        };

        if sender.send(event).is_err() {
            warn!(shard = %self.shard, event = %kind, "Kind worker is gone, occurrence dropped");
        }
    }

    /// Close every queue and wait for the workers to empty them.
    async fn finish(mut self) -> u64 {
        self.senders.clear();

        let mut routed = 0;
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok((kind, count)) => {
                    debug!(shard = %self.shard, event = %kind, routed = count, "Kind worker stopped");
                    routed += count;
                }
                Err(e) => {
                    warn!(shard = %self.shard, error = %e, "Kind worker ended abnormally");
                }
            }
        }
        routed
    }
}

async fn kind_worker(
    shard: ShardId,
    kind: EventKind,
    router: ShardRouter,
    mut rx: mpsc::UnboundedReceiver<Event>,
) -> (EventKind, u64) {
    let mut routed: u64 = 0;
    while let Some(event) = rx.recv().await {
        let outcome = router.route(shard, event).await;
        if !outcome.is_success() {
            debug!(
                %shard,
                event = %kind,
                faulted = outcome.faulted,
                "Occurrence completed with contained faults"
            );
        }
        routed += 1;
    }
    (kind, routed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventRegistry, occurrence_channel};
    use parking_lot::Mutex;
    use serde_json::json;
    use shardcast_sdk::objects::{Heartbeat, TypingStart};
    use std::sync::Arc;
    use std::time::Duration;

    fn heartbeat(seq: u64) -> Occurrence {
        Occurrence::Raw {
            name: "Heartbeated".to_string(),
            payload: json!({"ping_ms": 5, "sequence": seq}),
        }
    }

    fn typing(user: u64) -> Occurrence {
        Occurrence::Raw {
            name: "TypingStarted".to_string(),
            payload: json!({
                "channel_id": "1",
                "user_id": user.to_string(),
                "started_at": "2024-02-02T10:00:00Z"
            }),
        }
    }

    #[tokio::test]
    async fn test_lane_routes_in_order_and_drains_on_shutdown() {
        let registry = Arc::new(EventRegistry::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.heartbeated().subscribe(move |hb: Arc<Heartbeat>| {
            let sink = sink.clone();
            async move {
                tokio::task::yield_now().await;
                sink.lock().push(hb.sequence);
                Ok(())
            }
        });

        let (tx, rx) = occurrence_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        for seq in 0..10 {
            tx.send(heartbeat(seq)).unwrap();
        }
        // Shutdown before the lane even starts; queued occurrences still get routed.
        shutdown_tx.send(true).unwrap();

        let lane = ShardLane::new(ShardId(0), ShardRouter::new(registry));
        lane.run(shutdown_rx, rx).await;

        let expected: Vec<Option<u64>> = (0..10).map(Some).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[tokio::test]
    async fn test_lane_stops_when_senders_dropped() {
        let registry = Arc::new(EventRegistry::default());
        let (tx, rx) = occurrence_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(heartbeat(1)).unwrap();
        drop(tx);

        let lane = ShardLane::new(ShardId(3), ShardRouter::new(registry));
        tokio::time::timeout(Duration::from_secs(5), lane.run(shutdown_rx, rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_kinds_keep_their_own_order_when_interleaved() {
        let registry = Arc::new(EventRegistry::default());
        let beats = Arc::new(Mutex::new(Vec::new()));
        let typers = Arc::new(Mutex::new(Vec::new()));

        let sink = beats.clone();
        registry.heartbeated().subscribe(move |hb: Arc<Heartbeat>| {
            let sink = sink.clone();
            async move {
                tokio::task::yield_now().await;
                sink.lock().push(hb.sequence.unwrap_or_default());
                Ok(())
            }
        });
        let sink = typers.clone();
        registry.typing_started().subscribe(move |t: Arc<TypingStart>| {
            sink.lock().push(t.user_id.0);
            async { Ok(()) }
        });

        let (tx, rx) = occurrence_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        for n in 0..20 {
            tx.send(heartbeat(n)).unwrap();
            tx.send(typing(n)).unwrap();
        }
        drop(tx);

        ShardLane::new(ShardId(0), ShardRouter::new(registry))
            .run(shutdown_rx, rx)
            .await;

        assert_eq!(*beats.lock(), (0..20).collect::<Vec<_>>());
        assert_eq!(*typers.lock(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_hung_kind_does_not_block_other_kinds() {
        let registry = Arc::new(EventRegistry::default());
        let typed = Arc::new(Mutex::new(0u32));

        registry.heartbeated().subscribe(|_| async {
            std::future::pending::<()>().await;
            Ok(())
        });
        let counter = typed.clone();
        registry.typing_started().subscribe(move |_| {
            *counter.lock() += 1;
            async { Ok(()) }
        });

        let (tx, rx) = occurrence_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let lane = ShardLane::new(ShardId(0), ShardRouter::new(registry));
        let handle = tokio::spawn(lane.run(shutdown_rx, rx));

        tx.send(heartbeat(1)).unwrap();
        tx.send(typing(2)).unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while *typed.lock() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        // The heartbeat subscriber never returns; abandon the lane.
        handle.abort();
    }
}
