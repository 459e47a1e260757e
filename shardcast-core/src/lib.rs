#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod dispatch;
pub mod events;
pub mod hub;
pub mod processors;
pub mod router;

pub use config::DispatchConfig;
pub use dispatch::{AsyncEvent, Handler, InvokeOutcome};
pub use events::{
    ClientErrored, Event, EventKind, EventRegistry, Occurrence, ShardId, UnknownEvent,
};
pub use hub::{DispatchError, EventHub};
pub use router::ShardRouter;
