use serenity::{
    async_trait,
    client::Context,
    model::{
        event::Event,
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
        user::User,
    },
};
pub use serenity::prelude::RawEventHandler;
use crate::container::Components;

/// # The component trait.
///
/// Every component must implement this trait to be registered in a
/// [`ComponentContainer`](crate::ComponentContainer) and receive events from
/// the [`ComponentEventDispatcher`].
#[async_trait]
pub trait Component: Sync + Send {
    fn name(&self) -> &'static str;
    /// Called once before the client connects to the gateway.
    async fn start(&self) -> Result<(), String> {
        Ok(())
    }
    /// Called once when the bot shuts down.
    async fn stop(&self) {}
    async fn event(&self, event: &BotEvent);
}

/// Author of a message, as seen by the components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    /// `name#discriminator`
    pub name: String,
    pub avatar: String,
    pub bot: bool,
}
impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: format!("{}#{:0>4}", user.name, user.discriminator),
            avatar: user.face(),
            bot: user.bot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author: Author,
    /// Roles of the author in the guild. Empty in direct messages.
    pub member_roles: Vec<RoleId>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct IncomingReaction {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    /// Emoji in its textual form: the unicode character or `<:name:id>`.
    pub emoji: String,
}

/// Gateway events the components listen to.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Ready { user_id: UserId },
    MessageCreate(IncomingMessage),
    ReactionAdd(IncomingReaction),
}

impl BotEvent {
    /// Translate a serenity gateway event. Returns `None` for events no component needs.
    pub fn from_gateway(event: &Event) -> Option<BotEvent> {
        match event {
            Event::Ready(ready) => Some(BotEvent::Ready { user_id: ready.ready.user.id }),
            Event::MessageCreate(created) => {
                let message = &created.message;
                Some(BotEvent::MessageCreate(IncomingMessage {
                    id: message.id,
                    guild_id: message.guild_id,
                    channel_id: message.channel_id,
                    author: Author::from(&message.author),
                    member_roles: message.member.as_ref().map(|m| m.roles.clone()).unwrap_or_default(),
                    content: message.content.clone(),
                }))
            }
            Event::ReactionAdd(added) => {
                let reaction = &added.reaction;
                let user_id = reaction.user_id?;
                Some(BotEvent::ReactionAdd(IncomingReaction {
                    guild_id: reaction.guild_id,
                    channel_id: reaction.channel_id,
                    message_id: reaction.message_id,
                    user_id,
                    emoji: reaction.emoji.to_string(),
                }))
            }
            _ => None,
        }
    }
}

/// # The component event dispatcher.
///
/// This dispatcher is responsible for dispatching events to the components.
/// Add it to the client to receive events.
///
/// See [`serenity::client::ClientBuilder::raw_event_handler()`] for more information.
pub struct ComponentEventDispatcher {
    components: Components,
}

impl ComponentEventDispatcher {
    pub(crate) fn new(components: Components) -> Self {
        Self { components }
    }
    pub async fn dispatch(&self, event: &BotEvent) {
        for comp in &self.components {
            comp.event(event).await
        }
    }
}

#[async_trait]
impl RawEventHandler for ComponentEventDispatcher {
    async fn raw_event(&self, _: Context, ev: Event) {
        if let Some(event) = BotEvent::from_gateway(&ev) {
            self.dispatch(&event).await
        }
    }
}
