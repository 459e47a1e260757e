//! Meta-event payloads and shard identity.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identifies the shard connection an occurrence came from.
///
/// Carried for diagnostics only; never used for ordering or filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard:{}", self.0)
    }
}

/// An occurrence whose kind name is not part of the known set, or whose
/// payload did not decode into the kind's payload type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownEvent {
    /// Kind name exactly as the shard reported it.
    pub name: String,
    pub payload: serde_json::Value,
    pub shard_id: Option<ShardId>,
}

/// A subscriber failed while handling another event.
#[derive(Debug, Clone)]
pub struct ClientErrored {
    /// Kind whose subscriber failed, e.g. `"MessageCreated"`.
    pub event_name: &'static str,
    pub error: Arc<anyhow::Error>,
    pub shard_id: Option<ShardId>,
    /// Payload of the occurrence that was being handled.
    pub payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl ClientErrored {
    /// Borrow the triggering payload as `T`, if it is one.
    ///
    /// Kinds map to payload types as listed on [`EventKind`](super::EventKind).
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Display for ClientErrored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error while handling {}: {:#}", self.event_name, self.error)
    }
}

/// One occurrence handed from a shard connection to its lane.
#[derive(Debug, Clone)]
pub enum Occurrence {
    /// Already decoded by the connection layer.
    Typed(super::Event),
    /// Kind name and raw payload; decoded by the router.
    Raw {
        name: String,
        payload: serde_json::Value,
    },
}
