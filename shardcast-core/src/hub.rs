//! The client-owned dispatch hub.
//!
//! [`EventHub`] ties the pieces together for one client instance: it builds
//! the [`EventRegistry`] once, spawns one [`ShardLane`] per configured shard,
//! and tears all of it down in [`shutdown()`](EventHub::shutdown).

use crate::config::DispatchConfig;
use crate::events::{
    Event, EventRegistry, Occurrence, OccurrenceSender, ShardId, occurrence_channel,
};
use crate::processors::ShardLane;
use crate::router::ShardRouter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Errors returned when handing an occurrence to the hub.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The shard id is outside the configured shard range.
    #[error("{0} is not managed by this hub")]
    UnknownShard(ShardId),

    /// The shard's lane has stopped accepting occurrences.
    #[error("lane for {0} is closed")]
    LaneClosed(ShardId),
}

struct Lane {
    sender: OccurrenceSender,
    handle: JoinHandle<()>,
}

/// Owns the registry, the router and every shard lane of one client.
///
/// Must be created inside a Tokio runtime, since lanes are spawned on
/// construction.
pub struct EventHub {
    registry: Arc<EventRegistry>,
    router: ShardRouter,
    lanes: Vec<Lane>,
    shutdown_tx: watch::Sender<bool>,
}

impl EventHub {
    pub fn new(config: DispatchConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        let registry = Arc::new(EventRegistry::new(&config));
        let router = ShardRouter::new(Arc::clone(&registry));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let lanes = (0..shard_count)
            .map(|id| {
                let (sender, receiver) = occurrence_channel();
                let lane = ShardLane::new(ShardId(id), router.clone());
                let handle = tokio::spawn(lane.run(shutdown_rx.clone(), receiver));
                Lane { sender, handle }
            })
            .collect();

        info!(shards = shard_count, "EventHub started");

        Self {
            registry,
            router,
            lanes,
            shutdown_tx,
        }
    }

    /// Subscription points for every event kind.
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Direct routing, for callers that want to await dispatch themselves.
    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn shard_count(&self) -> u32 {
        self.lanes.len() as u32
    }

    /// Hand a decoded occurrence to `shard`'s lane. Never waits on subscribers.
    pub fn submit(&self, shard: ShardId, event: Event) -> Result<(), DispatchError> {
        self.hand_off(shard, Occurrence::Typed(event))
    }

    /// Hand a raw occurrence to `shard`'s lane; it is decoded on the lane.
    pub fn submit_raw(
        &self,
        shard: ShardId,
        name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError> {
        self.hand_off(
            shard,
            Occurrence::Raw {
                name: name.into(),
                payload,
            },
        )
    }

    fn hand_off(&self, shard: ShardId, occurrence: Occurrence) -> Result<(), DispatchError> {
        let lane = self
            .lanes
            .get(shard.0 as usize)
            .ok_or(DispatchError::UnknownShard(shard))?;
        lane.sender
            .send(occurrence)
            .map_err(|_| DispatchError::LaneClosed(shard))
    }

    /// Stop every lane after it routes its backlog, then drop all subscriptions.
    ///
    /// Subscribers are never cancelled, so a callback that never returns
    /// keeps this from completing.
    pub async fn shutdown(self) {
        info!("EventHub shutting down");
        let _ = self.shutdown_tx.send(true);

        for (id, lane) in self.lanes.into_iter().enumerate() {
            drop(lane.sender);
            if let Err(e) = lane.handle.await {
                warn!(shard = id, error = %e, "ShardLane task ended abnormally");
            }
        }

        self.registry.clear();
        info!(
            double_faults = self.registry.double_faults(),
            "EventHub shutdown complete"
        );
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("shards", &self.lanes.len())
            .field("registry", &self.registry)
            .finish()
    }
}
