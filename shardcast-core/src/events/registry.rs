//! Event kinds and the registry holding one channel per kind.
//!
//! Everything per-kind ([`EventKind`], [`Event`], the [`EventRegistry`]
//! accessors) is generated from the single table at the bottom of this file,
//! so adding a kind is a one-line change.

use super::types::{ClientErrored, ShardId, UnknownEvent};
use crate::config::DispatchConfig;
use crate::dispatch::{AsyncEvent, DoubleFaultGuard, ErrorFunnel, FaultSink, InvokeOutcome};
use serde::Deserialize;
use shardcast_sdk::objects::*;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while decoding a raw payload into an [`Event`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload does not match the kind's payload type.
    #[error("payload for {kind} did not match its schema: {source}")]
    Payload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },

    /// Meta kinds are produced by the dispatcher itself, never by a shard.
    #[error("{0} cannot be decoded from a raw payload")]
    NotRoutable(EventKind),
}

/// Error returned by [`EventKind::from_str`].
#[derive(Debug, Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownKindError(pub String);

macro_rules! event_registry {
    (
        $(
            $(#[$doc:meta])*
            $kind:ident => $field:ident : $payload:ty
        ),+ $(,)?
    ) => {
        /// Every event kind the dispatcher knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $(
                $(#[$doc])*
                $kind,
            )+
            /// An occurrence the router could not map to a known kind.
            UnknownEvent,
            /// A subscriber failed while handling another event.
            ClientErrored,
        }

        impl EventKind {
            /// All kinds, meta kinds last.
            pub const ALL: &'static [EventKind] = &[
                $(EventKind::$kind,)+
                EventKind::UnknownEvent,
                EventKind::ClientErrored,
            ];

            pub const fn name(self) -> &'static str {
                match self {
                    $(EventKind::$kind => stringify!($kind),)+
                    EventKind::UnknownEvent => "UnknownEvent",
                    EventKind::ClientErrored => "ClientErrored",
                }
            }

            /// Look a kind up by name, meta kinds included.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($kind) => Some(EventKind::$kind),)+
                    "UnknownEvent" => Some(EventKind::UnknownEvent),
                    "ClientErrored" => Some(EventKind::ClientErrored),
                    _ => None,
                }
            }

            /// Whether shards may produce this kind. Meta kinds are not routable.
            pub const fn is_routable(self) -> bool {
                !matches!(self, EventKind::UnknownEvent | EventKind::ClientErrored)
            }
        }

        /// One occurrence of some kind, carrying that kind's payload.
        #[derive(Debug, Clone)]
        pub enum Event {
            $($kind($payload),)+
            UnknownEvent(UnknownEvent),
            ClientErrored(ClientErrored),
        }

        impl Event {
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Event::$kind(_) => EventKind::$kind,)+
                    Event::UnknownEvent(_) => EventKind::UnknownEvent,
                    Event::ClientErrored(_) => EventKind::ClientErrored,
                }
            }

            /// Decode a raw JSON payload as an occurrence of `kind`.
            ///
            /// A `null` payload is read as an empty object, so kinds whose
            /// fields all have defaults may be sent without a body.
            pub fn decode(kind: EventKind, raw: &serde_json::Value) -> Result<Event, DecodeError> {
                let empty = serde_json::Value::Object(serde_json::Map::new());
                let raw = if raw.is_null() { &empty } else { raw };
                let payload_err = |source| DecodeError::Payload { kind, source };

                match kind {
                    $(
                        EventKind::$kind => <$payload>::deserialize(raw)
                            .map(Event::$kind)
                            .map_err(payload_err),
                    )+
                    EventKind::UnknownEvent | EventKind::ClientErrored => {
                        Err(DecodeError::NotRoutable(kind))
                    }
                }
            }
        }

        /// One broadcast channel per event kind, owned by a single client.
        ///
        /// Every channel except `ClientErrored` reports subscriber failures to
        /// the error funnel. `ClientErrored` reports to the double-fault guard.
        pub struct EventRegistry {
            $($field: AsyncEvent<$payload>,)+
            unknown_event: AsyncEvent<UnknownEvent>,
            funnel: Arc<ErrorFunnel>,
            guard: Arc<DoubleFaultGuard>,
        }

        impl EventRegistry {
            pub fn new(config: &DispatchConfig) -> Self {
                let threshold = config.slow_handler_threshold;
                let guard = Arc::new(DoubleFaultGuard::default());
                let funnel = Arc::new(ErrorFunnel::new(Arc::clone(&guard), threshold));
                let sink: Arc<dyn FaultSink> = funnel.clone();

                Self {
                    $(
                        $field: AsyncEvent::new(stringify!($kind), Arc::clone(&sink))
                            .with_slow_handler_threshold(threshold),
                    )+
                    unknown_event: AsyncEvent::new("UnknownEvent", sink)
                        .with_slow_handler_threshold(threshold),
                    funnel,
                    guard,
                }
            }

            $(
                $(#[$doc])*
                pub fn $field(&self) -> &AsyncEvent<$payload> {
                    &self.$field
                }
            )+

            /// Fired when a shard reports an event name the router does not know.
            pub fn unknown_event(&self) -> &AsyncEvent<UnknownEvent> {
                &self.unknown_event
            }

            /// Fired whenever a subscriber of any other kind fails.
            pub fn client_errored(&self) -> &AsyncEvent<ClientErrored> {
                self.funnel.channel()
            }

            /// Fan `event` out to its kind's subscribers.
            pub async fn fire(&self, shard: Option<ShardId>, event: Event) -> InvokeOutcome {
                match event {
                    $(
                        Event::$kind(payload) => {
                            self.$field.invoke_from(shard, Arc::new(payload)).await
                        }
                    )+
                    Event::UnknownEvent(payload) => {
                        self.unknown_event.invoke_from(shard, Arc::new(payload)).await
                    }
                    Event::ClientErrored(payload) => {
                        self.client_errored().invoke_from(shard, Arc::new(payload)).await
                    }
                }
            }

            /// Register `observer` on every channel, `ClientErrored` included.
            ///
            /// The observer sees only the kind of each delivered occurrence and
            /// stays registered until [`clear()`](EventRegistry::clear).
            pub fn observe_all<F>(&self, observer: F)
            where
                F: Fn(EventKind) + Clone + Send + Sync + 'static,
            {
                $(
                    let seen = observer.clone();
                    self.$field.subscribe(move |_| {
                        seen(EventKind::$kind);
                        async { Ok(()) }
                    });
                )+
                let seen = observer.clone();
                self.unknown_event.subscribe(move |_| {
                    seen(EventKind::UnknownEvent);
                    async { Ok(()) }
                });
                self.client_errored().subscribe(move |_| {
                    observer(EventKind::ClientErrored);
                    async { Ok(()) }
                });
            }

            /// Number of registrations on `kind`'s channel.
            pub fn subscriber_count(&self, kind: EventKind) -> usize {
                match kind {
                    $(EventKind::$kind => self.$field.len(),)+
                    EventKind::UnknownEvent => self.unknown_event.len(),
                    EventKind::ClientErrored => self.client_errored().len(),
                }
            }

            /// Drop every registration on every channel.
            pub fn clear(&self) {
                $(self.$field.clear();)+
                self.unknown_event.clear();
                self.client_errored().clear();
            }
        }
    };
}

event_registry! {
    // -- WebSocket ----------------------------------------------------------
    /// Fired whenever a WebSocket error occurs within the client.
    SocketErrored => socket_errored: SocketError,
    /// Fired whenever a WebSocket connection is established.
    SocketOpened => socket_opened: SocketOpen,
    /// Fired whenever a WebSocket connection is terminated.
    SocketClosed => socket_closed: SocketClose,
    /// Fired when a shard enters the ready state.
    Ready => ready: Ready,
    /// Fired whenever a session is resumed.
    Resumed => resumed: Ready,
    /// Fired on a received heartbeat ACK.
    Heartbeated => heartbeated: Heartbeat,

    // -- Channel ------------------------------------------------------------
    ChannelCreated => channel_created: ChannelCreate,
    DmChannelCreated => dm_channel_created: DmChannelCreate,
    ChannelUpdated => channel_updated: ChannelUpdate,
    ChannelDeleted => channel_deleted: ChannelDelete,
    DmChannelDeleted => dm_channel_deleted: DmChannelDelete,
    /// Fired whenever a message is pinned or unpinned in a channel.
    ChannelPinsUpdated => channel_pins_updated: ChannelPinsUpdate,

    // -- Guild --------------------------------------------------------------
    /// Fired when the user joins a new guild.
    GuildCreated => guild_created: GuildCreate,
    /// Fired when a guild from `Ready` becomes available.
    GuildAvailable => guild_available: GuildCreate,
    GuildUpdated => guild_updated: GuildUpdate,
    /// Fired when the user leaves or is removed from a guild.
    GuildDeleted => guild_deleted: GuildDelete,
    /// Fired when a guild becomes unavailable due to an outage.
    GuildUnavailable => guild_unavailable: GuildDelete,
    /// Fired once every guild announced in `Ready` has been received.
    GuildDownloadCompleted => guild_download_completed: GuildDownloadCompleted,
    GuildEmojisUpdated => guild_emojis_updated: GuildEmojisUpdate,
    GuildIntegrationsUpdated => guild_integrations_updated: GuildIntegrationsUpdate,

    // -- Guild ban ----------------------------------------------------------
    GuildBanAdded => guild_ban_added: GuildBan,
    GuildBanRemoved => guild_ban_removed: GuildBan,

    // -- Guild member -------------------------------------------------------
    GuildMemberAdded => guild_member_added: GuildMemberAdd,
    GuildMemberRemoved => guild_member_removed: GuildMemberRemove,
    GuildMemberUpdated => guild_member_updated: GuildMemberUpdate,
    /// Fired in response to a member list request, once per chunk.
    GuildMembersChunk => guild_members_chunk: GuildMembersChunk,

    // -- Guild role ---------------------------------------------------------
    GuildRoleCreated => guild_role_created: GuildRoleCreate,
    GuildRoleUpdated => guild_role_updated: GuildRoleUpdate,
    GuildRoleDeleted => guild_role_deleted: GuildRoleDelete,

    // -- Invite -------------------------------------------------------------
    InviteCreated => invite_created: InviteCreate,
    InviteDeleted => invite_deleted: InviteDelete,

    // -- Message ------------------------------------------------------------
    MessageCreated => message_created: MessageCreate,
    MessageUpdated => message_updated: MessageUpdate,
    MessageDeleted => message_deleted: MessageDelete,
    MessageBulkDeleted => message_bulk_deleted: MessageBulkDelete,

    // -- Message reaction ---------------------------------------------------
    MessageReactionAdded => message_reaction_added: MessageReactionAdd,
    MessageReactionRemoved => message_reaction_removed: MessageReactionRemove,
    /// Fired when all reactions are removed from a message.
    MessageReactionsCleared => message_reactions_cleared: MessageReactionsClear,
    /// Fired when all reactions of one emoji are removed from a message.
    MessageReactionRemovedEmoji => message_reaction_removed_emoji: MessageReactionRemoveEmoji,

    // -- User / presence ----------------------------------------------------
    PresenceUpdated => presence_updated: PresenceUpdate,
    /// Fired when the current user updates their settings.
    UserSettingsUpdated => user_settings_updated: UserSettingsUpdate,
    /// Fired when properties of the current user change.
    UserUpdated => user_updated: UserUpdate,

    // -- Voice --------------------------------------------------------------
    /// Fired when someone joins, leaves or moves between voice channels.
    VoiceStateUpdated => voice_state_updated: VoiceStateUpdate,
    VoiceServerUpdated => voice_server_updated: VoiceServerUpdate,

    // -- Misc ---------------------------------------------------------------
    TypingStarted => typing_started: TypingStart,
    WebhooksUpdated => webhooks_updated: WebhooksUpdate,
}

impl EventRegistry {
    /// Number of failures raised by `ClientErrored` subscribers so far.
    pub fn double_faults(&self) -> u64 {
        self.guard.count()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(&DispatchConfig::default())
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribed = EventKind::ALL
            .iter()
            .filter(|kind| self.subscriber_count(**kind) > 0)
            .count();
        f.debug_struct("EventRegistry")
            .field("kinds", &EventKind::ALL.len())
            .field("subscribed_kinds", &subscribed)
            .field("double_faults", &self.double_faults())
            .finish()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::from_name(s).ok_or_else(|| UnknownKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn message(content: &str) -> MessageCreate {
        serde_json::from_value(json!({
            "message": {
                "id": "1",
                "channel_id": "2",
                "author": {"id": "3", "username": "nelly"},
                "content": content,
                "timestamp": "2024-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(*kind));
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), *kind);
        }
        assert_eq!(EventKind::MessageCreated.to_string(), "MessageCreated");
        assert!(EventKind::from_name("MESSAGE_CREATE").is_none());
        assert!("Nope".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_meta_kinds_are_not_routable() {
        assert!(!EventKind::UnknownEvent.is_routable());
        assert!(!EventKind::ClientErrored.is_routable());
        assert!(EventKind::ALL.iter().filter(|k| k.is_routable()).count() >= 40);
        assert!(matches!(
            Event::decode(EventKind::ClientErrored, &json!({})),
            Err(DecodeError::NotRoutable(EventKind::ClientErrored))
        ));
    }

    #[test]
    fn test_decode_null_payload_for_defaults() {
        let event = Event::decode(EventKind::SocketOpened, &serde_json::Value::Null).unwrap();
        assert_eq!(event.kind(), EventKind::SocketOpened);
        assert!(matches!(event, Event::SocketOpened(SocketOpen { resuming: false })));
    }

    #[test]
    fn test_decode_mismatched_payload() {
        let err = Event::decode(EventKind::MessageDeleted, &json!({"id": "1"})).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Payload {
                kind: EventKind::MessageDeleted,
                ..
            }
        ));
    }

    #[test]
    fn test_shared_payload_types_keep_distinct_kinds() {
        let created = Event::decode(EventKind::GuildCreated, &json!({"guild": {"id": "5"}})).unwrap();
        let available =
            Event::decode(EventKind::GuildAvailable, &json!({"guild": {"id": "5"}})).unwrap();
        assert_eq!(created.kind(), EventKind::GuildCreated);
        assert_eq!(available.kind(), EventKind::GuildAvailable);
    }

    #[tokio::test]
    async fn test_fire_without_subscribers() {
        let registry = EventRegistry::default();
        for kind in EventKind::ALL.iter().filter(|k| k.is_routable()) {
            assert_eq!(registry.subscriber_count(*kind), 0);
        }
        let outcome = registry
            .fire(Some(ShardId(0)), Event::MessageCreated(message("hi")))
            .await;
        assert_eq!(outcome, InvokeOutcome::default());
        assert_eq!(registry.double_faults(), 0);
    }

    #[tokio::test]
    async fn test_fire_only_reaches_matching_kind() {
        let registry = EventRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        registry.message_created().subscribe(move |e: Arc<MessageCreate>| {
            let sink = sink.clone();
            async move {
                sink.lock().push(format!("created:{}", e.message.content));
                Ok(())
            }
        });
        let sink = seen.clone();
        registry.message_updated().subscribe(move |_| {
            sink.lock().push("updated".to_string());
            async { Ok(()) }
        });

        registry.fire(None, Event::MessageCreated(message("a"))).await;
        assert_eq!(*seen.lock(), vec!["created:a"]);
        assert_eq!(registry.subscriber_count(EventKind::MessageCreated), 1);
        assert_eq!(registry.subscriber_count(EventKind::MessageUpdated), 1);
    }

    #[tokio::test]
    async fn test_message_fault_reaches_client_errored() {
        let registry = EventRegistry::default();
        let l1 = Arc::new(Mutex::new(Vec::new()));
        let l2 = Arc::new(Mutex::new(Vec::new()));

        let sink = l1.clone();
        registry.message_created().subscribe(move |e: Arc<MessageCreate>| {
            let sink = sink.clone();
            async move {
                sink.lock().push(e.message.content.clone());
                Ok(())
            }
        });
        registry
            .message_created()
            .subscribe(|_| async { anyhow::bail!("timeout") });
        let sink = l2.clone();
        registry.client_errored().subscribe(move |e: Arc<ClientErrored>| {
            let sink = sink.clone();
            async move {
                let content = e
                    .payload_as::<MessageCreate>()
                    .map(|m| m.message.content.clone());
                sink.lock().push((e.event_name, e.error.to_string(), e.shard_id, content));
                Ok(())
            }
        });

        let outcome = registry
            .fire(Some(ShardId(2)), Event::MessageCreated(message("M")))
            .await;

        assert_eq!(outcome, InvokeOutcome { invoked: 2, faulted: 1 });
        assert_eq!(*l1.lock(), vec!["M".to_string()]);
        assert_eq!(
            *l2.lock(),
            vec![(
                "MessageCreated",
                "timeout".to_string(),
                Some(ShardId(2)),
                Some("M".to_string())
            )]
        );
        assert_eq!(registry.double_faults(), 0);
    }

    #[tokio::test]
    async fn test_failing_client_errored_subscriber_does_not_recurse() {
        let registry = EventRegistry::default();
        let h2_calls = Arc::new(Mutex::new(0u32));

        let counter = h2_calls.clone();
        registry.client_errored().subscribe(move |_| {
            *counter.lock() += 1;
            async { anyhow::bail!("error handler broke") }
        });
        registry
            .guild_created()
            .subscribe(|_| async { anyhow::bail!("bad guild") });

        let event = Event::decode(EventKind::GuildCreated, &json!({"guild": {"id": "9"}})).unwrap();
        let outcome = registry.fire(Some(ShardId(0)), event).await;

        assert_eq!(outcome.faulted, 1);
        assert_eq!(*h2_calls.lock(), 1);
        assert_eq!(registry.double_faults(), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_every_subscription() {
        let registry = EventRegistry::default();
        registry.ready().subscribe(|_| async { Ok(()) });
        registry.unknown_event().subscribe(|_| async { Ok(()) });
        registry.client_errored().subscribe(|_| async { Ok(()) });

        registry.clear();

        for kind in EventKind::ALL {
            assert_eq!(registry.subscriber_count(*kind), 0);
        }
    }

    #[tokio::test]
    async fn test_observe_all_sees_every_kind() {
        let registry = EventRegistry::default();
        let kinds = Arc::new(Mutex::new(Vec::new()));

        let sink = kinds.clone();
        registry.observe_all(move |kind| sink.lock().push(kind));
        for kind in EventKind::ALL {
            assert_eq!(registry.subscriber_count(*kind), 1);
        }

        registry
            .typing_started()
            .subscribe(|_| async { anyhow::bail!("typing broke") });
        let typing = Event::decode(
            EventKind::TypingStarted,
            &json!({"channel_id": "1", "user_id": "2", "started_at": "2024-01-01T00:00:00Z"}),
        )
        .unwrap();
        registry.fire(Some(ShardId(0)), typing).await;
        registry
            .fire(
                None,
                Event::UnknownEvent(UnknownEvent {
                    name: "X".to_string(),
                    payload: json!({}),
                    shard_id: None,
                }),
            )
            .await;

        assert_eq!(
            *kinds.lock(),
            vec![
                EventKind::TypingStarted,
                EventKind::ClientErrored,
                EventKind::UnknownEvent
            ]
        );
    }
}
