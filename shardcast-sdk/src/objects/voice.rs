use super::ids::Snowflake;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Someone joined, left or moved between voice channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdate {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// `None` when the user disconnected.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: CompactString,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

/// A guild's voice server changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceServerUpdate {
    pub guild_id: Snowflake,
    pub token: String,
    /// `None` when the voice server is unavailable.
    #[serde(default)]
    pub endpoint: Option<String>,
}
