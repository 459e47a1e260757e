//! Gateway event payload objects.
//!
//! One module per area of the gateway surface. Several event kinds share a
//! payload type (a guild becoming available carries the same data as a guild
//! being created), so payload types are not one-to-one with event kinds.

pub mod channel;
pub mod gateway;
pub mod guild;
pub mod ids;
pub mod message;
pub mod misc;
pub mod user;
pub mod voice;

pub use channel::{
    Channel, ChannelCreate, ChannelDelete, ChannelKind, ChannelPinsUpdate, ChannelUpdate,
    DmChannelCreate, DmChannelDelete,
};
pub use gateway::{Heartbeat, Ready, SocketClose, SocketError, SocketOpen};
pub use guild::{
    Emoji, Guild, GuildBan, GuildCreate, GuildDelete, GuildDownloadCompleted, GuildEmojisUpdate,
    GuildIntegrationsUpdate, GuildMemberAdd, GuildMemberRemove, GuildMemberUpdate,
    GuildMembersChunk, GuildRoleCreate, GuildRoleDelete, GuildRoleUpdate, GuildUpdate, Member,
    Role,
};
pub use ids::{Snowflake, SnowflakeParseError};
pub use message::{
    Message, MessageBulkDelete, MessageCreate, MessageDelete, MessageReactionAdd,
    MessageReactionRemove, MessageReactionRemoveEmoji, MessageReactionsClear, MessageUpdate,
    ReactionEmoji,
};
pub use misc::{InviteCreate, InviteDelete, TypingStart, WebhooksUpdate};
pub use user::{PresenceStatus, PresenceUpdate, User, UserSettingsUpdate, UserUpdate};
pub use voice::{VoiceServerUpdate, VoiceStateUpdate};
