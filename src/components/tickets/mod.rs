//! Ticket lifecycle.
//!
//! A ticket is a row in the database plus a private channel under the configured
//! ticket category. It is open from its creation until it gets closed, either right away
//! or by a deferred task; closed is final.

mod archive;
pub mod naming;
pub mod permissions;

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::DbConn;
use serenity::model::id::{ChannelId, GuildId, UserId};
use ticketbot_core::message::{Message, COLOR_DEFAULT};

use crate::{
    components::utils::task::{TaskID, TaskManager},
    db::{controller, model::ticket, RowID},
    error::{Error, Result},
    log_error, log_info, log_warn,
    platform::{send_and_delete, ChannelInfo, ChannelKind, IgnoreNotFound, Platform, Principal, UserProfile},
    relay::{Frame, Relay, TicketAction},
    settings::{SettingKey, Settings},
};

pub use self::archive::archive_card;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    Scheduled(TaskID),
}

/// The ticket engine, shared by the components.
pub struct Tickets {
    db: DbConn,
    platform: Arc<dyn Platform>,
    settings: Arc<Settings>,
    relay: Relay,
    scheduler: TaskManager,
}

impl Tickets {
    pub fn new(db: DbConn, platform: Arc<dyn Platform>, settings: Arc<Settings>, relay: Relay) -> Self {
        Self {
            db,
            platform,
            settings,
            relay,
            scheduler: TaskManager::new(),
        }
    }

    /// Channel category holding the ticket channels, if configured.
    pub async fn ticket_category(&self) -> Result<Option<ChannelId>> {
        Ok(self.settings.get(SettingKey::TicketCategory).await?.map(ChannelId))
    }

    /// Open a ticket for `creator` in a new channel under `parent`.
    ///
    /// The row is committed before the channel exists. If the channel cannot be created,
    /// the row stays without channel until [`Tickets::sync`] closes it.
    pub async fn create_ticket(
        &self,
        creator: &UserProfile,
        guild: GuildId,
        parent: ChannelId,
        category_id: Option<RowID>,
        reason: Option<String>,
    ) -> Result<(ticket::Model, ChannelInfo)> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if let Some(reason) = &reason {
            if reason.chars().count() > ticket::REASON_MAX_LEN {
                return Err(Error::invalid(format!(
                    "The reason is at most {} characters long",
                    ticket::REASON_MAX_LEN
                )));
            }
        }
        if let Some(category_id) = category_id {
            controller::category::find_category(&self.db, category_id).await?;
        }
        let principals = permissions::resolve_ticket_principals(&self.settings).await?;

        controller::discord::save_user(&self.db, creator.id, &creator.name, &creator.avatar).await?;
        let mut ticket = controller::ticket::create_ticket(&self.db, creator.id, category_id, reason).await?;

        let overwrites = permissions::build_overwrites(&principals, creator.id);
        let channel = self
            .platform
            .create_text_channel(guild, parent, &naming::ticket_channel_name(ticket.id), &overwrites)
            .await
            .map_err(|e| {
                log_error!("Ticket {}: channel creation failed: {}", ticket.id, e);
                e
            })?;
        controller::ticket::attach_channel(&self.db, ticket.id, channel.id).await?;
        ticket.channel_id = Some(channel.id.0 as i64);
        log_info!("Ticket {} opened in {}", ticket.id, channel.id);

        if let Err(e) = self.ping(channel.id, creator.id).await {
            log_warn!("Ticket {}: ping failed: {}", ticket.id, e);
        }
        if let Err(e) = self.platform.send_message(channel.id, welcome_card(&ticket, creator)).await {
            log_warn!("Ticket {}: welcome message failed: {}", ticket.id, e);
        }
        Ok((ticket, channel))
    }

    /// Notify the mention roles and the creator without leaving the ping behind.
    async fn ping(&self, channel: ChannelId, creator: UserId) -> Result<()> {
        let mut mentions = self
            .settings
            .get_list(SettingKey::MentionRole)
            .await?
            .into_iter()
            .map(|role| format!("<@&{}>", role))
            .collect::<Vec<_>>();
        mentions.push(format!("<@{}>", creator.0));
        send_and_delete(self.platform.as_ref(), channel, Message::with_text(mentions.join(" "))).await?;
        Ok(())
    }

    /// Open ticket hosted by `channel`.
    pub async fn require_open(&self, channel: ChannelId) -> Result<ticket::Model> {
        match controller::ticket::find_by_channel(&self.db, channel).await? {
            Some(ticket) if ticket.is_open => Ok(ticket),
            Some(ticket) => Err(Error::Conflict(format!("Ticket {} is already closed", ticket.id))),
            None => Err(Error::not_found("This channel is not a ticket")),
        }
    }

    /// Close the ticket of `text`, now or after `delay`.
    ///
    /// A negative delay is rejected before anything changes. A deferred close checks the
    /// ticket again when it fires.
    pub async fn close_ticket(
        self: &Arc<Self>,
        actor: UserId,
        text: ChannelId,
        voice: Option<ChannelId>,
        delay: Duration,
    ) -> Result<CloseOutcome> {
        let delay = delay
            .to_std()
            .map_err(|_| Error::invalid("Cannot close a ticket in the past"))?;
        let ticket = self.require_open(text).await?;
        if delay.is_zero() {
            self.finish_close(actor, text, voice).await?;
            return Ok(CloseOutcome::Closed);
        }
        let engine = Arc::clone(self);
        let task = self.scheduler.add(delay, async move {
            engine.finish_close(actor, text, voice).await.map(|_| ())
        });
        log_info!("Ticket {}: close scheduled in {} seconds (task {})", ticket.id, delay.as_secs(), task);
        Ok(CloseOutcome::Scheduled(task))
    }

    /// Close the ticket of `text` if it is still open, delete its channels and archive it.
    ///
    /// Returns false when there was nothing left to close.
    pub async fn finish_close(&self, actor: UserId, text: ChannelId, voice: Option<ChannelId>) -> Result<bool> {
        let ticket = match controller::ticket::find_by_channel(&self.db, text).await? {
            Some(ticket) if ticket.is_open => ticket,
            _ => {
                log_info!("Channel {}: no open ticket left to close", text);
                return Ok(false);
            }
        };
        if !controller::ticket::mark_closed(&self.db, ticket.id).await? {
            return Ok(false);
        }
        log_info!("Ticket {} closed by {}", ticket.id, actor);

        let mut failure = None;
        for channel in std::iter::once(text).chain(voice) {
            if let Err(e) = self.platform.delete_channel(channel).await.ignore_not_found() {
                log_error!("Ticket {}: cannot delete channel {}: {}", ticket.id, channel, e);
                failure.get_or_insert(e);
            }
        }
        self.relay
            .send(ticket.id, Frame::Action(TicketAction::Close { by: actor.0 }))
            .await;
        if let Err(e) = self.archive(&ticket, actor).await {
            log_warn!("Ticket {}: archive failed: {}", ticket.id, e);
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(true),
        }
    }

    /// Post the archive card. Skipped when no archive channel is configured.
    pub async fn archive(&self, ticket: &ticket::Model, closed_by: UserId) -> Result<bool> {
        let channel = match self.settings.get(SettingKey::ArchiveChannel).await? {
            Some(channel) => ChannelId(channel),
            None => return Ok(false),
        };
        self.platform
            .send_message(channel, archive_card(ticket, closed_by, Utc::now()))
            .await?;
        Ok(true)
    }

    /// Rename the ticket channel, keeping the ticket id as suffix. The voice channel of the
    /// ticket follows, so it can still be found by name.
    pub async fn rename(&self, channel: ChannelId, requested: &str) -> Result<String> {
        let ticket = self.require_open(channel).await?;
        let name = naming::renamed_channel(requested, ticket.id)?;
        let voice = self.find_voice(channel).await?;
        self.platform.rename_channel(channel, &name).await?;
        if let Some(voice) = voice {
            self.platform.rename_channel(voice, &name).await?;
        }
        self.relay
            .notify_action(&name, TicketAction::Rename { name: name.clone() })
            .await;
        Ok(name)
    }

    pub async fn add_participant(&self, channel: ChannelId, user: UserId) -> Result<()> {
        self.require_open(channel).await?;
        let info = self.platform.channel(channel).await?;
        if info.overwrites.contains_key(&Principal::Member(user)) {
            return Err(Error::Conflict(format!("<@{}> is already in the ticket", user.0)));
        }
        self.platform
            .set_member_overwrite(channel, user, Some(permissions::ticket_permissions()))
            .await?;
        self.relay
            .notify_action(&info.name, TicketAction::Add { user: user.0 })
            .await;
        Ok(())
    }

    /// Revoke the access of `user`. Members of the ticket roles cannot be removed.
    pub async fn remove_participant(&self, channel: ChannelId, user: UserId) -> Result<()> {
        self.require_open(channel).await?;
        let info = self.platform.channel(channel).await?;
        if !info.overwrites.contains_key(&Principal::Member(user)) {
            return Err(Error::not_found(format!("<@{}> is not in the ticket", user.0)));
        }
        let staff = permissions::ticket_roles(&self.settings).await?;
        let roles = self.platform.member_roles(info.guild_id, user).await?;
        if roles.iter().any(|role| staff.contains(role)) {
            return Err(Error::Forbidden("Cannot remove a ticket helper or ticket manager".to_string()));
        }
        self.platform.set_member_overwrite(channel, user, None).await?;
        self.relay
            .notify_action(&info.name, TicketAction::Remove { user: user.0 })
            .await;
        Ok(())
    }

    /// Voice channel next to the ticket, with the same name and the same access.
    pub async fn create_voice(&self, channel: ChannelId) -> Result<ChannelInfo> {
        self.require_open(channel).await?;
        let info = self.platform.channel(channel).await?;
        let voice = self
            .platform
            .create_voice_channel(info.guild_id, info.parent_id, &info.name, &info.overwrites)
            .await?;
        self.relay
            .notify_action(&info.name, TicketAction::Voice { channel: voice.id.0 })
            .await;
        Ok(voice)
    }

    /// Voice channel created for the ticket of `text`, found by name.
    pub async fn find_voice(&self, text: ChannelId) -> Result<Option<ChannelId>> {
        let info = self.platform.channel(text).await?;
        Ok(self
            .platform
            .guild_channels(info.guild_id)
            .await?
            .into_iter()
            .find(|c| c.kind == ChannelKind::Voice && c.name == info.name)
            .map(|c| c.id))
    }

    /// Close every open ticket whose channel is gone from the ticket category.
    ///
    /// Returns the number of tickets closed.
    pub async fn sync(&self, guild: GuildId) -> Result<u64> {
        let category = self
            .ticket_category()
            .await?
            .ok_or_else(|| Error::Config("No ticket category is configured".to_string()))?;
        let live = self
            .platform
            .guild_channels(guild)
            .await?
            .into_iter()
            .filter(|c| c.parent_id == Some(category))
            .map(|c| c.id)
            .collect::<Vec<_>>();
        let closed = controller::ticket::close_missing(&self.db, &live).await?;
        log_info!("Sync: {} ticket(s) marked closed", closed);
        Ok(closed)
    }

    pub fn pending_closes(&self) -> usize {
        self.scheduler.pending()
    }

    /// Drop the deferred closes. They are not kept across restarts.
    pub fn shutdown(&self) {
        let dropped = self.scheduler.clear();
        if dropped > 0 {
            log_warn!("{} scheduled close(s) dropped", dropped);
        }
    }
}

fn welcome_card(ticket: &ticket::Model, creator: &UserProfile) -> Message {
    let mut msg = Message::new();
    msg.add_embed(|e| {
        e.title("New Ticket").color(COLOR_DEFAULT).description(format!(
            "Welcome <@{}>! Someone will be with you shortly.",
            creator.id.0
        ));
        if let Some(reason) = &ticket.reason {
            e.field("Reason", reason, false);
        }
        e.footer(format!("Ticket #{}", ticket.id))
    });
    msg.silent()
}
