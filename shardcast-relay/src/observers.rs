//! Subscribers the relay installs on every hub it runs.

use parking_lot::Mutex;
use shardcast_core::{ClientErrored, EventKind, EventRegistry, UnknownEvent};
use shardcast_sdk::objects::SocketClose;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Delivered occurrences, counted per kind.
#[derive(Debug, Default)]
pub struct KindCounters {
    counts: Mutex<HashMap<EventKind, u64>>,
}

impl KindCounters {
    pub fn record(&self, kind: EventKind) {
        *self.counts.lock().entry(kind).or_default() += 1;
    }

    /// Non-zero counts in kind declaration order.
    pub fn snapshot(&self) -> Vec<(EventKind, u64)> {
        let counts = self.counts.lock();
        EventKind::ALL
            .iter()
            .filter_map(|kind| counts.get(kind).map(|n| (*kind, *n)))
            .collect()
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        let total: u64 = snapshot.iter().map(|(_, n)| n).sum();
        info!(total, "Delivered occurrences");
        for (kind, count) in snapshot {
            info!(event = %kind, count, "Delivered occurrences");
        }
    }
}

/// Install the built-in loggers and the per-kind counters.
pub fn install(registry: &EventRegistry) -> Arc<KindCounters> {
    registry
        .client_errored()
        .subscribe(|errored: Arc<ClientErrored>| {
            warn!(
                event = errored.event_name,
                shard = ?errored.shard_id,
                error = %errored.error,
                "Subscriber failure reported"
            );
            async { Ok(()) }
        });

    registry
        .unknown_event()
        .subscribe(|unknown: Arc<UnknownEvent>| {
            info!(
                name = %unknown.name,
                shard = ?unknown.shard_id,
                "Received occurrence of unknown kind"
            );
            async { Ok(()) }
        });

    registry.socket_closed().subscribe(|close: Arc<SocketClose>| {
        if close.is_fatal() {
            warn!(code = close.code, reason = %close.reason, "Shard connection closed, not resumable");
        } else {
            info!(code = close.code, reason = %close.reason, "Shard connection closed");
        }
        async { Ok(()) }
    });

    let counters = Arc::new(KindCounters::default());
    let sink = Arc::clone(&counters);
    registry.observe_all(move |kind| sink.record(kind));
    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shardcast_core::{Event, ShardId};
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_install_counts_and_logs() {
        let registry = EventRegistry::default();
        let counters = install(&registry);
        registry
            .heartbeated()
            .subscribe(|_| async { anyhow::bail!("ping handler broke") });

        let heartbeat = Event::decode(EventKind::Heartbeated, &json!({"ping_ms": 42})).unwrap();
        registry.fire(Some(ShardId(0)), heartbeat.clone()).await;
        registry.fire(Some(ShardId(1)), heartbeat).await;
        registry
            .fire(
                Some(ShardId(0)),
                Event::UnknownEvent(UnknownEvent {
                    name: "STAGE_INSTANCE_CREATE".to_string(),
                    payload: json!({}),
                    shard_id: Some(ShardId(0)),
                }),
            )
            .await;

        assert_eq!(
            counters.snapshot(),
            vec![
                (EventKind::Heartbeated, 2),
                (EventKind::UnknownEvent, 1),
                (EventKind::ClientErrored, 2)
            ]
        );
        assert_eq!(registry.double_faults(), 0);
        assert!(logs_contain("Subscriber failure reported"));
        assert!(logs_contain("STAGE_INSTANCE_CREATE"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_fatal_socket_close_is_flagged() {
        let registry = EventRegistry::default();
        install(&registry);

        let fatal = Event::decode(
            EventKind::SocketClosed,
            &json!({"code": 4014, "reason": "Disallowed intents"}),
        )
        .unwrap();
        registry.fire(Some(ShardId(2)), fatal).await;
        assert!(logs_contain("Shard connection closed, not resumable"));
        assert!(logs_contain("Disallowed intents"));

        let normal = Event::decode(EventKind::SocketClosed, &json!({"code": 4000})).unwrap();
        registry.fire(Some(ShardId(2)), normal).await;
        assert!(logs_contain("code=4000"));
    }
}
