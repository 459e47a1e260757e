//! Long-running processors of the dispatch pipeline.
//!
//! - `ShardLane`: receives one shard's `Occurrence`s, routes them in order

pub mod shard_lane;

pub use shard_lane::ShardLane;
