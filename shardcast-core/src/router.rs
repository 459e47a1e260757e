//! Fan-in from shard connections to the event registry.

use crate::dispatch::InvokeOutcome;
use crate::events::{Event, EventKind, EventRegistry, Occurrence, ShardId, UnknownEvent};
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes occurrences from any shard into the shared [`EventRegistry`].
///
/// The router is stateless apart from the registry handle: concurrent calls
/// from different shards are independent, and calls from one shard are
/// routed in the order that shard makes them.
#[derive(Clone, Debug)]
pub struct ShardRouter {
    registry: Arc<EventRegistry>,
}

impl ShardRouter {
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Fan a decoded occurrence out to its kind's subscribers.
    ///
    /// Subscriber failures are contained in the registry; this never fails.
    pub async fn route(&self, shard: ShardId, event: Event) -> InvokeOutcome {
        debug!(%shard, event = %event.kind(), "Routing occurrence");
        self.registry.fire(Some(shard), event).await
    }

    /// Decode and route an occurrence given by kind name and raw payload.
    pub async fn route_raw(
        &self,
        shard: ShardId,
        name: &str,
        payload: serde_json::Value,
    ) -> InvokeOutcome {
        let event = Self::resolve(shard, name, payload);
        self.route(shard, event).await
    }

    /// Route whatever a lane received.
    pub async fn route_occurrence(&self, shard: ShardId, occurrence: Occurrence) -> InvokeOutcome {
        let event = Self::resolve_occurrence(shard, occurrence);
        self.route(shard, event).await
    }

    /// Turn a lane occurrence into an [`Event`], decoding raw payloads.
    pub fn resolve_occurrence(shard: ShardId, occurrence: Occurrence) -> Event {
        match occurrence {
            Occurrence::Typed(event) => event,
            Occurrence::Raw { name, payload } => Self::resolve(shard, &name, payload),
        }
    }

    /// Map a kind name and raw payload to an [`Event`].
    ///
    /// Names outside the routable set, and payloads that do not decode, become
    /// [`Event::UnknownEvent`] carrying the raw name and payload.
    pub fn resolve(shard: ShardId, name: &str, payload: serde_json::Value) -> Event {
        let kind = EventKind::from_name(name).filter(|kind| kind.is_routable());
        if let Some(kind) = kind {
            match Event::decode(kind, &payload) {
                Ok(event) => return event,
                Err(e) => {
                    warn!(%shard, event = name, error = %e, "Failed to decode payload, routing as UnknownEvent");
                }
            }
        } else {
            debug!(%shard, event = name, "Unrecognized event name, routing as UnknownEvent");
        }

        Event::UnknownEvent(UnknownEvent {
            name: name.to_string(),
            payload,
            shard_id: Some(shard),
        })
    }
}
