//! Connection lifecycle payloads.

use super::guild::Guild;
use super::user::User;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A WebSocket level error reported by a shard connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketError {
    pub message: String,
}

/// A WebSocket connection was established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketOpen {
    /// Set when the connection resumes a previous session instead of identifying.
    #[serde(default)]
    pub resuming: bool,
}

/// A WebSocket connection was terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketClose {
    /// Close code sent by the remote end.
    pub code: u16,
    #[serde(default)]
    pub reason: String,
}

impl SocketClose {
    /// Gateway close codes in the 4000 range that forbid reconnecting.
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
    }
}

/// Payload of `Ready` and `Resumed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ready {
    pub session_id: CompactString,
    pub user: User,
    /// Guilds this session is in; initially unavailable until their create event arrives.
    #[serde(default)]
    pub guilds: Vec<Guild>,
    /// `[shard_id, shard_count]` as reported by the gateway.
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}

/// A heartbeat was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Round-trip latency of the heartbeat in milliseconds.
    pub ping_ms: u64,
    /// Sequence number sent with the heartbeat, if any.
    #[serde(default)]
    pub sequence: Option<u64>,
}
