//! Mirror of the chat of the ticket channels.
//!
//! Messages are stored for the transcript and relayed to the live viewers.

use std::sync::Arc;

use sea_orm::DbConn;
use serenity::async_trait;
use ticketbot_core::{BotEvent, Component, IncomingMessage};

use crate::{
    db::controller::{discord, ticket},
    error::Result,
    log_error,
    platform::Platform,
    relay::{ChatMessage, Frame, Relay},
    settings::{SettingKey, Settings},
};

pub struct Transcript {
    db: DbConn,
    platform: Arc<dyn Platform>,
    settings: Arc<Settings>,
    relay: Relay,
}

impl Transcript {
    pub fn new(db: DbConn, platform: Arc<dyn Platform>, settings: Arc<Settings>, relay: Relay) -> Self {
        Self {
            db,
            platform,
            settings,
            relay,
        }
    }

    /// Store and relay a message posted in a ticket. Returns false when it was not recorded.
    pub async fn record(&self, msg: &IncomingMessage) -> Result<bool> {
        if msg.content.trim().is_empty() || msg.author.bot || msg.guild_id.is_none() {
            return Ok(false);
        }
        let category = match self.settings.get(SettingKey::TicketCategory).await? {
            Some(category) => category,
            None => return Ok(false),
        };
        let channel = self.platform.channel(msg.channel_id).await?;
        if channel.parent_id.map(|p| p.0) != Some(category) {
            return Ok(false);
        }
        let found = match ticket::find_by_channel(&self.db, msg.channel_id).await? {
            Some(found) => found,
            None => return Ok(false),
        };
        discord::save_user(&self.db, msg.author.id, &msg.author.name, &msg.author.avatar).await?;
        ticket::save_message(&self.db, found.id, msg.author.id, &msg.content).await?;
        self.relay
            .send(
                found.id,
                Frame::Chat(ChatMessage {
                    author: msg.author.name.clone(),
                    avatar: msg.author.avatar.clone(),
                    message: msg.content.clone(),
                }),
            )
            .await;
        Ok(true)
    }
}

#[async_trait]
impl Component for Transcript {
    fn name(&self) -> &'static str {
        "transcript"
    }
    async fn event(&self, event: &BotEvent) {
        if let BotEvent::MessageCreate(msg) = event {
            if let Err(e) = self.record(msg).await {
                log_error!("Message {} not recorded: {}", msg.id, e);
            }
        }
    }
}
