//! In-memory doubles shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use sea_orm::{ConnectOptions, Database, DbConn};
use serenity::{
    async_trait,
    model::{
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
        permissions::Permissions,
    },
};
use ticketbot_core::message::Message;

use crate::{
    components::tickets::Tickets,
    db::check_tables,
    platform::{
        ChannelInfo, ChannelKind, Overwrite, Overwrites, Platform, PlatformError, PlatformResult, Principal,
        UserProfile,
    },
    relay::{MemoryPubSub, Relay},
    settings::{MemoryBackend, SettingKey, Settings},
};

pub const GUILD: GuildId = GuildId(1);
pub const BOT: UserId = UserId(999);
pub const MENTION_ROLE: RoleId = RoleId(100);
pub const PANEL_ROLE: RoleId = RoleId(200);
pub const MANAGEMENT_ROLE: RoleId = RoleId(300);

pub async fn memory_db() -> DbConn {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("in-memory database");
    check_tables(&db).await.expect("tables");
    db
}

#[derive(Default)]
pub struct FakeState {
    next_id: u64,
    pub channels: HashMap<ChannelId, ChannelInfo>,
    /// Messages still present, by id.
    pub messages: HashMap<MessageId, (ChannelId, Message)>,
    /// Every message ever sent, in order.
    pub sent: Vec<(ChannelId, Message)>,
    pub deleted_messages: Vec<MessageId>,
    pub member_roles: HashMap<UserId, Vec<RoleId>>,
    pub added_reactions: Vec<(MessageId, String)>,
    pub removed_reactions: Vec<(MessageId, UserId, String)>,
    pub fail_channel_creation: bool,
    pub fail_reaction_removal: bool,
}

/// Discord as a few hash maps.
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 10_000,
                ..Default::default()
            }),
        }
    }
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
    fn next_id(state: &mut FakeState) -> u64 {
        state.next_id += 1;
        state.next_id
    }
    pub fn add_channel(&self, name: &str, kind: ChannelKind, parent: Option<ChannelId>) -> ChannelId {
        let mut state = self.state();
        let id = ChannelId(Self::next_id(&mut state));
        state.channels.insert(
            id,
            ChannelInfo {
                id,
                guild_id: GUILD,
                name: name.to_string(),
                kind,
                parent_id: parent,
                overwrites: Overwrites::new(),
            },
        );
        id
    }
    /// Someone deleted the channel by hand.
    pub fn remove_channel(&self, id: ChannelId) {
        self.state().channels.remove(&id);
    }
    pub fn channel_info(&self, id: ChannelId) -> Option<ChannelInfo> {
        self.state().channels.get(&id).cloned()
    }
    pub fn set_roles(&self, user: UserId, roles: Vec<RoleId>) {
        self.state().member_roles.insert(user, roles);
    }
    pub fn sent_to(&self, channel: ChannelId) -> Vec<Message> {
        self.state()
            .sent
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }
    /// Embed titles of the messages sent to `channel`, in order.
    pub fn titles_in(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel)
            .iter()
            .filter_map(|m| m.last_embed().and_then(|e| e.title.clone()))
            .collect()
    }
    fn create_channel(&self, guild: GuildId, parent: Option<ChannelId>, name: &str, overwrites: &Overwrites, kind: ChannelKind) -> PlatformResult<ChannelInfo> {
        let mut state = self.state();
        if state.fail_channel_creation {
            return Err(PlatformError::Request("Missing Permissions".to_string()));
        }
        if let Some(parent) = parent {
            if !state.channels.contains_key(&parent) {
                return Err(PlatformError::NotFound(format!("channel {}", parent)));
            }
        }
        let id = ChannelId(Self::next_id(&mut state));
        let info = ChannelInfo {
            id,
            guild_id: guild,
            name: name.to_string(),
            kind,
            parent_id: parent,
            overwrites: overwrites.clone(),
        };
        state.channels.insert(id, info.clone());
        Ok(info)
    }
}

fn missing<T>(what: impl std::fmt::Display) -> PlatformResult<T> {
    Err(PlatformError::NotFound(what.to_string()))
}

#[async_trait]
impl Platform for FakePlatform {
    fn bot_id(&self) -> UserId {
        BOT
    }
    async fn send_message(&self, channel: ChannelId, message: Message) -> PlatformResult<MessageId> {
        let mut state = self.state();
        if !state.channels.contains_key(&channel) {
            return missing(format!("channel {}", channel));
        }
        let id = MessageId(Self::next_id(&mut state));
        state.messages.insert(id, (channel, message.clone()));
        state.sent.push((channel, message));
        Ok(id)
    }
    async fn edit_message(&self, _channel: ChannelId, message_id: MessageId, message: Message) -> PlatformResult<()> {
        match self.state().messages.get_mut(&message_id) {
            Some(entry) => {
                entry.1 = message;
                Ok(())
            }
            None => missing(format!("message {}", message_id)),
        }
    }
    async fn delete_message(&self, _channel: ChannelId, message_id: MessageId) -> PlatformResult<()> {
        let mut state = self.state();
        match state.messages.remove(&message_id) {
            Some(_) => {
                state.deleted_messages.push(message_id);
                Ok(())
            }
            None => missing(format!("message {}", message_id)),
        }
    }
    async fn message(&self, channel: ChannelId, message_id: MessageId) -> PlatformResult<()> {
        let state = self.state();
        match state.messages.get(&message_id) {
            Some((c, _)) if *c == channel && state.channels.contains_key(c) => Ok(()),
            _ => missing(format!("message {}", message_id)),
        }
    }
    async fn create_text_channel(&self, guild: GuildId, parent: ChannelId, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo> {
        self.create_channel(guild, Some(parent), name, overwrites, ChannelKind::Text)
    }
    async fn create_voice_channel(&self, guild: GuildId, parent: Option<ChannelId>, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo> {
        self.create_channel(guild, parent, name, overwrites, ChannelKind::Voice)
    }
    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()> {
        match self.state().channels.remove(&channel) {
            Some(_) => Ok(()),
            None => missing(format!("channel {}", channel)),
        }
    }
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()> {
        match self.state().channels.get_mut(&channel) {
            Some(info) => {
                info.name = name.to_string();
                Ok(())
            }
            None => missing(format!("channel {}", channel)),
        }
    }
    async fn set_member_overwrite(&self, channel: ChannelId, user: UserId, allow: Option<Permissions>) -> PlatformResult<()> {
        let mut state = self.state();
        let info = match state.channels.get_mut(&channel) {
            Some(info) => info,
            None => return missing(format!("channel {}", channel)),
        };
        match allow {
            Some(allow) => {
                info.overwrites.insert(Principal::Member(user), Overwrite { allow, deny: Permissions::empty() });
            }
            None => {
                info.overwrites.remove(&Principal::Member(user));
            }
        }
        Ok(())
    }
    async fn channel(&self, channel: ChannelId) -> PlatformResult<ChannelInfo> {
        match self.channel_info(channel) {
            Some(info) => Ok(info),
            None => missing(format!("channel {}", channel)),
        }
    }
    async fn guild_channels(&self, guild: GuildId) -> PlatformResult<Vec<ChannelInfo>> {
        let mut channels = self
            .state()
            .channels
            .values()
            .filter(|c| c.guild_id == guild)
            .cloned()
            .collect::<Vec<_>>();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }
    async fn member_roles(&self, _guild: GuildId, user: UserId) -> PlatformResult<Vec<RoleId>> {
        Ok(self.state().member_roles.get(&user).cloned().unwrap_or_default())
    }
    async fn user(&self, user: UserId) -> PlatformResult<UserProfile> {
        Ok(UserProfile {
            id: user,
            name: format!("user{}#0000", user.0),
            avatar: format!("https://cdn.example/{}.png", user.0),
        })
    }
    async fn add_reaction(&self, channel: ChannelId, message_id: MessageId, emoji: &str) -> PlatformResult<()> {
        self.message(channel, message_id).await?;
        self.state().added_reactions.push((message_id, emoji.to_string()));
        Ok(())
    }
    async fn remove_reaction(&self, _channel: ChannelId, message_id: MessageId, user: UserId, emoji: &str) -> PlatformResult<()> {
        let mut state = self.state();
        if state.fail_reaction_removal {
            return Err(PlatformError::Request("Missing Permissions".to_string()));
        }
        state.removed_reactions.push((message_id, user, emoji.to_string()));
        Ok(())
    }
}

/// A configured guild with a ticket category, an archive channel and a lobby.
pub struct Harness {
    pub db: DbConn,
    pub platform: Arc<FakePlatform>,
    pub settings: Arc<Settings>,
    pub hub: Arc<MemoryPubSub>,
    pub relay: Relay,
    pub tickets: Arc<Tickets>,
    pub category: ChannelId,
    pub archive: ChannelId,
    pub lobby: ChannelId,
}

pub async fn harness() -> Harness {
    let db = memory_db().await;
    let platform = Arc::new(FakePlatform::new());
    let category = platform.add_channel("Tickets", ChannelKind::Category, None);
    let archive = platform.add_channel("archive", ChannelKind::Text, None);
    let lobby = platform.add_channel("lobby", ChannelKind::Text, None);

    let settings = Arc::new(Settings::new(MemoryBackend::new(), "test"));
    settings.set(SettingKey::TicketCategory, category.0).await.unwrap();
    settings.set(SettingKey::ArchiveChannel, archive.0).await.unwrap();
    settings.add(SettingKey::MentionRole, MENTION_ROLE.0).await.unwrap();
    settings.set(SettingKey::PanelAccessRole, PANEL_ROLE.0).await.unwrap();
    settings.set(SettingKey::ManagementRole, MANAGEMENT_ROLE.0).await.unwrap();

    let hub = Arc::new(MemoryPubSub::new());
    let relay = Relay::with_backend(hub.clone());
    let tickets = Arc::new(Tickets::new(db.clone(), platform.clone(), settings.clone(), relay.clone()));
    Harness {
        db,
        platform,
        settings,
        hub,
        relay,
        tickets,
        category,
        archive,
        lobby,
    }
}

impl Harness {
    pub fn profile(&self, id: u64) -> UserProfile {
        UserProfile {
            id: UserId(id),
            name: format!("user{}#0000", id),
            avatar: format!("https://cdn.example/{}.png", id),
        }
    }
}

/// Poll `done` until it holds, failing the test after a few seconds.
///
/// Tests backed by the sqlite pool run on the real clock, so they wait on a condition
/// rather than for a fixed time.
pub async fn wait_until<F: FnMut() -> bool>(what: &str, mut done: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
