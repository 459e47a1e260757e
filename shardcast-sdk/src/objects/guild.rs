//! Guild, member, role, ban and emoji payloads.

use super::ids::Snowflake;
use super::user::User;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<CompactString>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub member_count: Option<u64>,
    /// Set while the guild is in an outage or not yet received from the gateway.
    #[serde(default)]
    pub unavailable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: CompactString,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i32,
    /// Permission bit set, as sent by the gateway.
    #[serde(default)]
    pub permissions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    pub name: CompactString,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<CompactString>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub joined_at: Option<OffsetDateTime>,
}

/// Payload of `GuildCreated` and `GuildAvailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildCreate {
    pub guild: Guild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildUpdate {
    #[serde(default)]
    pub before: Option<Guild>,
    pub after: Guild,
}

/// Payload of `GuildDeleted` and `GuildUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDelete {
    pub guild_id: Snowflake,
    /// `true` for an outage, `false` when the current user left or was removed.
    #[serde(default)]
    pub unavailable: bool,
}

/// Every guild announced in `Ready` has been received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDownloadCompleted {
    pub guild_ids: Vec<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildEmojisUpdate {
    pub guild_id: Snowflake,
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildIntegrationsUpdate {
    pub guild_id: Snowflake,
}

/// Payload of `GuildBanAdded` and `GuildBanRemoved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildBan {
    pub guild_id: Snowflake,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberAdd {
    pub guild_id: Snowflake,
    pub member: Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberRemove {
    pub guild_id: Snowflake,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberUpdate {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(default)]
    pub nick: Option<CompactString>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// One chunk of a member list requested from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMembersChunk {
    pub guild_id: Snowflake,
    pub members: Vec<Member>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl GuildMembersChunk {
    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.chunk_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleCreate {
    pub guild_id: Snowflake,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleUpdate {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub before: Option<Role>,
    pub after: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRoleDelete {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_chunk_last() {
        let chunk: GuildMembersChunk = serde_json::from_str(
            r#"{"guild_id": "1", "members": [], "chunk_index": 2, "chunk_count": 3}"#,
        )
        .unwrap();
        assert!(chunk.is_last());
        assert!(chunk.nonce.is_none());
    }

    #[test]
    fn test_member_joined_at_parsing() {
        let member: Member = serde_json::from_str(
            r#"{
                "user": {"id": "80351110224678912", "username": "Nelly"},
                "roles": ["41771983423143936"],
                "joined_at": "2015-04-26T06:26:56.936Z"
            }"#,
        )
        .unwrap();
        assert_eq!(member.roles, vec![Snowflake(41771983423143936)]);
        assert_eq!(member.joined_at.unwrap().year(), 2015);
        assert!(member.nick.is_none());
    }
}
