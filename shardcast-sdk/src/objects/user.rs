//! Users, presences and per-user settings.

use super::ids::Snowflake;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: CompactString,
    #[serde(default)]
    pub discriminator: Option<CompactString>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user: User,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub status: PresenceStatus,
    /// Name of the activity the user is engaged in, if any.
    #[serde(default)]
    pub activity: Option<String>,
}

/// The current user changed one of their client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettingsUpdate {
    pub user: User,
    #[serde(default)]
    pub locale: Option<CompactString>,
    #[serde(default)]
    pub status: Option<PresenceStatus>,
}

/// Properties of the current user changed.
///
/// Only emitted for the connected account, never for other users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub before: Option<User>,
    pub after: User,
}
