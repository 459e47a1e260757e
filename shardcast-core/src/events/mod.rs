//! Event kinds, occurrences and the per-kind registry.
//!
//! # Event Flow
//!
//! 1. A shard connection decodes an occurrence and hands it to its lane
//! 2. The lane calls the `ShardRouter`, preserving the shard's order
//! 3. The router fires the matching channel of the `EventRegistry`
//! 4. Subscriber failures go to `ClientErrored`; failures there are only logged
//!
//! Kinds are a closed set fixed at build time. Names the router does not
//! know become `UnknownEvent` occurrences instead of being dropped.

pub mod channels;
pub mod registry;
pub mod types;

pub use channels::{OccurrenceReceiver, OccurrenceSender, occurrence_channel};
pub use registry::{DecodeError, Event, EventKind, EventRegistry, UnknownKindError};
pub use types::{ClientErrored, Occurrence, ShardId, UnknownEvent};
