//! Capabilities of the chat platform used by the ticket subsystem.
//!
//! The components never talk to Discord directly: they go through [`Platform`],
//! implemented over the serenity HTTP client by [`SerenityPlatform`].

mod discord;

use std::collections::HashMap;

use ::serenity::{
    async_trait,
    model::{
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
        permissions::Permissions,
    },
};
use thiserror::Error;
use ticketbot_core::message::Message;

pub use self::discord::SerenityPlatform;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Request(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

pub trait IgnoreNotFound {
    /// Treat a vanished target as success.
    fn ignore_not_found(self) -> PlatformResult<()>;
}
impl IgnoreNotFound for PlatformResult<()> {
    fn ignore_not_found(self) -> PlatformResult<()> {
        match self {
            Err(PlatformError::NotFound(_)) => Ok(()),
            other => other,
        }
    }
}

/// Subject of a permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    Role(RoleId),
    Member(UserId),
    /// The implicit `@everyone` role of the guild.
    Everyone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overwrite {
    pub allow: Permissions,
    pub deny: Permissions,
}

pub type Overwrites = HashMap<Principal, Overwrite>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
    pub overwrites: Overwrites,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    /// `name#discriminator`
    pub name: String,
    pub avatar: String,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Identifier of the bot account.
    fn bot_id(&self) -> UserId;

    async fn send_message(&self, channel: ChannelId, message: Message) -> PlatformResult<MessageId>;
    async fn edit_message(&self, channel: ChannelId, message_id: MessageId, message: Message) -> PlatformResult<()>;
    async fn delete_message(&self, channel: ChannelId, message_id: MessageId) -> PlatformResult<()>;
    /// Fail with [`PlatformError::NotFound`] when the message or its channel is gone.
    async fn message(&self, channel: ChannelId, message_id: MessageId) -> PlatformResult<()>;

    /// Create a text channel. Every overwrite is applied with the creation, or the creation fails.
    async fn create_text_channel(&self, guild: GuildId, parent: ChannelId, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo>;
    async fn create_voice_channel(&self, guild: GuildId, parent: Option<ChannelId>, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo>;
    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()>;
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()>;
    /// Set the overwrite of a single member. `None` clears it.
    async fn set_member_overwrite(&self, channel: ChannelId, user: UserId, allow: Option<Permissions>) -> PlatformResult<()>;
    async fn channel(&self, channel: ChannelId) -> PlatformResult<ChannelInfo>;
    async fn guild_channels(&self, guild: GuildId) -> PlatformResult<Vec<ChannelInfo>>;

    async fn member_roles(&self, guild: GuildId, user: UserId) -> PlatformResult<Vec<RoleId>>;
    async fn user(&self, user: UserId) -> PlatformResult<UserProfile>;

    async fn add_reaction(&self, channel: ChannelId, message_id: MessageId, emoji: &str) -> PlatformResult<()>;
    async fn remove_reaction(&self, channel: ChannelId, message_id: MessageId, user: UserId, emoji: &str) -> PlatformResult<()>;
}

/// Send a message and delete it right away.
///
/// Used to notify people through their client without leaving the ping in the channel.
pub async fn send_and_delete(platform: &dyn Platform, channel: ChannelId, message: Message) -> PlatformResult<()> {
    let id = platform.send_message(channel, message).await?;
    platform.delete_message(channel, id).await.ignore_not_found()
}
