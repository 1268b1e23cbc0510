//! [`Platform`] implementation over the serenity HTTP client.

use std::sync::Arc;

use serenity::{
    async_trait,
    builder::CreateEmbed,
    http::{Http, HttpError},
    model::{
        channel::{Channel, ChannelType, GuildChannel, PermissionOverwrite, PermissionOverwriteType, ReactionType},
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
        permissions::Permissions,
    },
};
use ticketbot_core::message::Message;

use super::{ChannelInfo, ChannelKind, Overwrite, Overwrites, Platform, PlatformError, PlatformResult, Principal, UserProfile};

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(http_err) = &err {
            if let HttpError::UnsuccessfulRequest(resp) = http_err.as_ref() {
                if resp.status_code.as_u16() == 404 {
                    return PlatformError::NotFound(resp.error.message.clone());
                }
            }
        }
        PlatformError::Request(err.to_string())
    }
}

pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_id: UserId,
}

impl SerenityPlatform {
    /// Build the HTTP client and resolve the bot account.
    pub async fn connect(token: &str) -> PlatformResult<Self> {
        let http = Arc::new(Http::new(token));
        let current = http.get_current_user().await?;
        Ok(Self { http, bot_id: current.id })
    }
}

fn reaction_type(emoji: &str) -> PlatformResult<ReactionType> {
    ReactionType::try_from(emoji).map_err(|_| PlatformError::Request(format!("Invalid emoji {}", emoji)))
}

fn to_permission_overwrites(guild: GuildId, overwrites: &Overwrites) -> Vec<PermissionOverwrite> {
    overwrites
        .iter()
        .map(|(principal, overwrite)| PermissionOverwrite {
            allow: overwrite.allow,
            deny: overwrite.deny,
            kind: match principal {
                Principal::Role(role) => PermissionOverwriteType::Role(*role),
                Principal::Member(user) => PermissionOverwriteType::Member(*user),
                Principal::Everyone => PermissionOverwriteType::Role(RoleId(guild.0)),
            },
        })
        .collect()
}

fn from_permission_overwrites(guild: GuildId, overwrites: &[PermissionOverwrite]) -> Overwrites {
    overwrites
        .iter()
        .filter_map(|o| {
            let principal = match o.kind {
                PermissionOverwriteType::Role(role) if role.0 == guild.0 => Principal::Everyone,
                PermissionOverwriteType::Role(role) => Principal::Role(role),
                PermissionOverwriteType::Member(user) => Principal::Member(user),
                #[allow(unreachable_patterns)]
                _ => return None,
            };
            Some((principal, Overwrite { allow: o.allow, deny: o.deny }))
        })
        .collect()
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Voice => ChannelKind::Voice,
        ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}

fn channel_info(channel: GuildChannel) -> ChannelInfo {
    ChannelInfo {
        overwrites: from_permission_overwrites(channel.guild_id, &channel.permission_overwrites),
        id: channel.id,
        guild_id: channel.guild_id,
        name: channel.name,
        kind: channel_kind(channel.kind),
        parent_id: channel.parent_id,
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn send_message(&self, channel: ChannelId, message: Message) -> PlatformResult<MessageId> {
        let embeds: Vec<CreateEmbed> = message.create_embeds();
        let sent = channel
            .send_message(&self.http, |m| {
                if !message.content.is_empty() {
                    m.content(&message.content);
                }
                if !message.allow_mentions {
                    m.allowed_mentions(|am| am.empty_parse());
                }
                m.add_embeds(embeds)
            })
            .await?;
        Ok(sent.id)
    }

    async fn edit_message(&self, channel: ChannelId, message_id: MessageId, message: Message) -> PlatformResult<()> {
        let embeds = message.create_embeds();
        channel
            .edit_message(&self.http, message_id, |m| m.content(&message.content).set_embeds(embeds))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message_id: MessageId) -> PlatformResult<()> {
        channel.delete_message(&self.http, message_id).await?;
        Ok(())
    }

    async fn message(&self, channel: ChannelId, message_id: MessageId) -> PlatformResult<()> {
        self.http.get_message(channel.0, message_id.0).await?;
        Ok(())
    }

    async fn create_text_channel(&self, guild: GuildId, parent: ChannelId, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo> {
        let permissions = to_permission_overwrites(guild, overwrites);
        let channel = guild
            .create_channel(&self.http, |c| {
                c.name(name)
                    .kind(ChannelType::Text)
                    .category(parent)
                    .permissions(permissions)
            })
            .await?;
        Ok(channel_info(channel))
    }

    async fn create_voice_channel(&self, guild: GuildId, parent: Option<ChannelId>, name: &str, overwrites: &Overwrites) -> PlatformResult<ChannelInfo> {
        let permissions = to_permission_overwrites(guild, overwrites);
        let channel = guild
            .create_channel(&self.http, |c| {
                c.name(name).kind(ChannelType::Voice).permissions(permissions);
                if let Some(parent) = parent {
                    c.category(parent);
                }
                c
            })
            .await?;
        Ok(channel_info(channel))
    }

    async fn delete_channel(&self, channel: ChannelId) -> PlatformResult<()> {
        channel.delete(&self.http).await?;
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> PlatformResult<()> {
        channel.edit(&self.http, |c| c.name(name)).await?;
        Ok(())
    }

    async fn set_member_overwrite(&self, channel: ChannelId, user: UserId, allow: Option<Permissions>) -> PlatformResult<()> {
        match allow {
            Some(allow) => {
                channel
                    .create_permission(&self.http, &PermissionOverwrite {
                        allow,
                        deny: Permissions::empty(),
                        kind: PermissionOverwriteType::Member(user),
                    })
                    .await?
            }
            None => channel.delete_permission(&self.http, PermissionOverwriteType::Member(user)).await?,
        }
        Ok(())
    }

    async fn channel(&self, channel: ChannelId) -> PlatformResult<ChannelInfo> {
        match self.http.get_channel(channel.0).await? {
            Channel::Guild(channel) => Ok(channel_info(channel)),
            Channel::Category(category) => Ok(ChannelInfo {
                overwrites: from_permission_overwrites(category.guild_id, &category.permission_overwrites),
                id: category.id,
                guild_id: category.guild_id,
                name: category.name,
                kind: ChannelKind::Category,
                parent_id: category.parent_id,
            }),
            _ => Err(PlatformError::NotFound(format!("{} is not a guild channel", channel.0))),
        }
    }

    async fn guild_channels(&self, guild: GuildId) -> PlatformResult<Vec<ChannelInfo>> {
        let channels = guild.channels(&self.http).await?;
        Ok(channels.into_values().map(channel_info).collect())
    }

    async fn member_roles(&self, guild: GuildId, user: UserId) -> PlatformResult<Vec<RoleId>> {
        Ok(self.http.get_member(guild.0, user.0).await?.roles)
    }

    async fn user(&self, user: UserId) -> PlatformResult<UserProfile> {
        let user = self.http.get_user(user.0).await?;
        Ok(UserProfile {
            id: user.id,
            name: format!("{}#{:0>4}", user.name, user.discriminator),
            avatar: user.face(),
        })
    }

    async fn add_reaction(&self, channel: ChannelId, message_id: MessageId, emoji: &str) -> PlatformResult<()> {
        channel.create_reaction(&self.http, message_id, reaction_type(emoji)?).await?;
        Ok(())
    }

    async fn remove_reaction(&self, channel: ChannelId, message_id: MessageId, user: UserId, emoji: &str) -> PlatformResult<()> {
        channel
            .delete_reaction(&self.http, message_id, Some(user), reaction_type(emoji)?)
            .await?;
        Ok(())
    }
}
