//! Typed payloads for every gateway event kind.
//!
//! These are plain data objects: the connection layer produces them and the
//! dispatch core in `shardcast-core` hands them to subscribers. Nothing in
//! this crate performs I/O.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod objects;

pub use objects::ids::Snowflake;
