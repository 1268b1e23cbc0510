//! Reaction panels.
//!
//! A panel is a card posted by the staff with one emoji per ticket category. Reacting
//! opens a ticket in that category and the reaction is taken back right away.

use std::{sync::Arc, time::Duration};

use sea_orm::DbConn;
use serenity::{
    async_trait,
    model::id::{ChannelId, MessageId, UserId},
};
use ticketbot_core::{
    message::{Message, COLOR_DEFAULT},
    BotEvent, Component, IncomingReaction,
};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    components::tickets::Tickets,
    db::{controller::{category, panel}, model, RowID},
    error::{Error, Result},
    log_error, log_info, log_warn,
    platform::{ChannelKind, IgnoreNotFound, Platform},
};

/// Accept a unicode emoji or a custom one (`<:name:id>`, `<a:name:id>`).
pub fn validate_emoji(emoji: &str) -> Result<()> {
    lazy_static::lazy_static!(
        static ref RE_CUSTOM: regex::Regex = regex::Regex::new(r"^<a?:[A-Za-z0-9_]{2,32}:\d+>$").unwrap();
    );
    let unicode = !emoji.is_ascii() && !emoji.chars().any(char::is_whitespace) && emoji.chars().count() <= 16;
    if RE_CUSTOM.is_match(emoji) || unicode {
        Ok(())
    } else {
        Err(Error::invalid(format!("`{}` is not an emoji", emoji)))
    }
}

fn panel_card(title: &str, content: &str) -> Message {
    let mut msg = Message::new();
    msg.add_embed(|e| e.title(title).description(content).color(COLOR_DEFAULT));
    msg
}

pub struct Panels {
    db: DbConn,
    platform: Arc<dyn Platform>,
    tickets: Arc<Tickets>,
    refresh_period: Duration,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl Panels {
    pub fn new(db: DbConn, platform: Arc<dyn Platform>, tickets: Arc<Tickets>, refresh_period: Duration) -> Self {
        Self {
            db,
            platform,
            tickets,
            refresh_period,
            refresher: Mutex::new(None),
        }
    }

    /// Handle a reaction added anywhere. Returns the ticket opened, if any.
    ///
    /// Every reaction but the bot's own is taken back before looking for a panel.
    pub async fn dispatch_reaction(&self, reaction: &IncomingReaction) -> Result<Option<RowID>> {
        // The bot's own reactions are the panel options.
        if reaction.user_id == self.platform.bot_id() {
            return Ok(None);
        }
        if let Err(e) = self
            .platform
            .remove_reaction(reaction.channel_id, reaction.message_id, reaction.user_id, &reaction.emoji)
            .await
        {
            log_warn!(
                "Cannot remove the reaction of {} on message {}: {}",
                reaction.user_id,
                reaction.message_id,
                e
            );
        }
        let guild = match reaction.guild_id {
            Some(guild) => guild,
            None => return Ok(None),
        };
        let panel = match panel::find_panel_by_message(&self.db, reaction.message_id).await? {
            Some(panel) => panel,
            None => return Ok(None),
        };
        let binding = match panel::find_binding(&self.db, panel.id, &reaction.emoji).await? {
            Some(binding) => binding,
            None => return Ok(None),
        };
        let parent = match self.tickets.ticket_category().await? {
            Some(parent) => parent,
            None => {
                log_warn!("Panel {}: no ticket category configured", panel.id);
                return Ok(None);
            }
        };
        match self.platform.channel(parent).await {
            Ok(info) if info.kind == ChannelKind::Category => (),
            Ok(_) => {
                log_warn!("Panel {}: {} is not a channel category", panel.id, parent);
                return Ok(None);
            }
            Err(e) => {
                log_warn!("Panel {}: ticket category unavailable: {}", panel.id, e);
                return Ok(None);
            }
        }
        let creator = self.platform.user(reaction.user_id).await?;
        let (ticket, _) = self
            .tickets
            .create_ticket(&creator, guild, parent, Some(binding.category_id), None)
            .await?;
        Ok(Some(ticket.id))
    }

    /// Put the options back on every panel still reachable. Returns how many were refreshed.
    pub async fn refresh_all(&self) -> Result<usize> {
        refresh_panels(&self.db, self.platform.as_ref()).await
    }

    /// Post a new panel in `channel` with its emoji bindings.
    pub async fn create_panel(
        &self,
        channel: ChannelId,
        title: &str,
        content: &str,
        bindings: &[(String, RowID)],
    ) -> Result<model::panel::Model> {
        if title.trim().is_empty() || title.chars().count() > 256 {
            return Err(Error::invalid("A panel title is 1 to 256 characters long"));
        }
        if bindings.is_empty() {
            return Err(Error::invalid("A panel needs at least one reaction"));
        }
        for (emoji, category_id) in bindings {
            validate_emoji(emoji)?;
            category::find_category(&self.db, *category_id).await?;
        }
        let info = self.platform.channel(channel).await?;
        if info.kind != ChannelKind::Text {
            return Err(Error::invalid(format!("<#{}> is not a text channel", channel.0)));
        }

        let message_id = self.platform.send_message(channel, panel_card(title, content)).await?;
        let created = match panel::create_panel(&self.db, channel, title, content, bindings).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(e) = self.platform.delete_message(channel, message_id).await.ignore_not_found() {
                    log_warn!("Cannot delete the orphan panel message {}: {}", message_id, e);
                }
                return Err(e);
            }
        };
        panel::set_panel_message(&self.db, created.id, message_id).await?;
        for (emoji, _) in bindings {
            if let Err(e) = self.platform.add_reaction(channel, message_id, emoji).await {
                log_warn!("Panel {}: cannot add {}: {}", created.id, emoji, e);
            }
        }
        Ok(model::panel::Model {
            message_id: Some(message_id.0 as i64),
            ..created
        })
    }

    pub async fn bind_reaction(&self, panel_id: RowID, emoji: &str, category_id: RowID) -> Result<()> {
        validate_emoji(emoji)?;
        panel::bind_reaction(&self.db, panel_id, emoji, category_id).await?;
        let found = panel::find_panel(&self.db, panel_id).await?;
        if let Some(message_id) = found.message_id {
            if let Err(e) = self
                .platform
                .add_reaction(ChannelId(found.channel_id as u64), MessageId(message_id as u64), emoji)
                .await
            {
                log_warn!("Panel {}: cannot add {}: {}", panel_id, emoji, e);
            }
        }
        Ok(())
    }

    pub async fn unbind_reaction(&self, panel_id: RowID, emoji: &str) -> Result<()> {
        panel::unbind_reaction(&self.db, panel_id, emoji).await?;
        let found = panel::find_panel(&self.db, panel_id).await?;
        if let Some(message_id) = found.message_id {
            let bot: UserId = self.platform.bot_id();
            if let Err(e) = self
                .platform
                .remove_reaction(ChannelId(found.channel_id as u64), MessageId(message_id as u64), bot, emoji)
                .await
            {
                log_warn!("Panel {}: cannot take back {}: {}", panel_id, emoji, e);
            }
        }
        Ok(())
    }

    /// Delete the panel, its bindings and its message.
    pub async fn delete_panel(&self, panel_id: RowID) -> Result<()> {
        let deleted = panel::delete_panel(&self.db, panel_id).await?;
        if let Some(message_id) = deleted.message_id {
            if let Err(e) = self
                .platform
                .delete_message(ChannelId(deleted.channel_id as u64), MessageId(message_id as u64))
                .await
                .ignore_not_found()
            {
                log_warn!("Panel {}: cannot delete its message: {}", panel_id, e);
            }
        }
        Ok(())
    }

    pub async fn list_panels(&self) -> Result<Vec<(model::panel::Model, Vec<model::reaction::Model>)>> {
        let mut panels = Vec::new();
        for found in panel::list_panels(&self.db).await? {
            let reactions = panel::panel_reactions(&self.db, found.id).await?;
            panels.push((found, reactions));
        }
        Ok(panels)
    }
}

#[async_trait]
impl Component for Panels {
    fn name(&self) -> &'static str {
        "panels"
    }
    async fn start(&self) -> std::result::Result<(), String> {
        self.start_refresh().await;
        Ok(())
    }
    async fn stop(&self) {
        if let Some(handle) = self.refresher.lock().await.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log_error!("Panel refresh ended badly: {}", e);
                }
            }
        }
    }
    async fn event(&self, event: &BotEvent) {
        if let BotEvent::ReactionAdd(reaction) = event {
            match self.dispatch_reaction(reaction).await {
                Ok(Some(ticket)) => log_info!("Ticket {} opened from a panel by {}", ticket, reaction.user_id),
                Ok(None) => (),
                Err(e) => log_error!("Panel reaction of {} failed: {}", reaction.user_id, e),
            }
        }
    }
}

impl Panels {
    /// Start the periodic refresh. A failed pass is retried on the next tick.
    async fn start_refresh(&self) {
        let db = self.db.clone();
        let platform = Arc::clone(&self.platform);
        let period = self.refresh_period;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match refresh_panels(&db, platform.as_ref()).await {
                    Ok(count) => log_info!("{} panel(s) refreshed", count),
                    Err(e) => log_error!("Panel refresh failed: {}", e),
                }
            }
        });
        if let Some(previous) = self.refresher.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

async fn refresh_panels(db: &DbConn, platform: &dyn Platform) -> Result<usize> {
    let mut refreshed = 0;
    for found in panel::list_panels(db).await? {
        let message_id = match found.message_id {
            Some(id) => MessageId(id as u64),
            None => continue,
        };
        let channel = ChannelId(found.channel_id as u64);
        if let Err(e) = platform.message(channel, message_id).await {
            log_warn!("Panel {}: message unavailable, skipped: {}", found.id, e);
            continue;
        }
        for reaction in panel::panel_reactions(db, found.id).await? {
            if let Err(e) = platform.add_reaction(channel, message_id, &reaction.emoji).await {
                log_warn!("Panel {}: cannot add {}: {}", found.id, reaction.emoji, e);
            }
        }
        refreshed += 1;
    }
    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::controller::{category::create_category, ticket::open_tickets},
        settings::SettingKey,
        testing::{harness, wait_until, Harness, BOT, GUILD},
    };

    fn panels(h: &Harness, period: Duration) -> Arc<Panels> {
        Arc::new(Panels::new(h.db.clone(), h.platform.clone(), h.tickets.clone(), period))
    }

    fn reaction(message_id: MessageId, channel: ChannelId, user: u64, emoji: &str) -> IncomingReaction {
        IncomingReaction {
            guild_id: Some(GUILD),
            channel_id: channel,
            message_id,
            user_id: UserId(user),
            emoji: emoji.to_string(),
        }
    }

    #[test]
    fn emojis() {
        assert!(validate_emoji("🎫").is_ok());
        assert!(validate_emoji("<:ticket:123456>").is_ok());
        assert!(validate_emoji("<a:spin_ticket:42>").is_ok());
        assert!(validate_emoji("ticket").is_err());
        assert!(validate_emoji("<:x:12>").is_err());
        assert!(validate_emoji("").is_err());
    }

    #[tokio::test]
    async fn reaction_opens_a_ticket_in_the_bound_category() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Need help?", "React below", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);
        assert_eq!(h.platform.state().added_reactions, vec![(message_id, "🎫".to_string())]);

        let opened = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🎫")).await.unwrap();
        let tickets = open_tickets(&h.db).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(opened, Some(tickets[0].id));
        assert_eq!(tickets[0].category_id, Some(billing.id));
        assert_eq!(tickets[0].creator_id, 5);
        assert_eq!(
            h.platform.state().removed_reactions,
            vec![(message_id, UserId(5), "🎫".to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_emoji_is_removed_and_ignored() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Need help?", "React below", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);

        let opened = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🍕")).await.unwrap();
        assert_eq!(opened, None);
        assert!(open_tickets(&h.db).await.unwrap().is_empty());
        assert_eq!(h.platform.state().removed_reactions.len(), 1);

        let own = panels.dispatch_reaction(&reaction(message_id, h.lobby, BOT.0, "🎫")).await.unwrap();
        assert_eq!(own, None);
        assert_eq!(h.platform.state().removed_reactions.len(), 1);

        let elsewhere = panels.dispatch_reaction(&reaction(MessageId(1), h.lobby, 5, "🎫")).await.unwrap();
        assert_eq!(elsewhere, None);
        assert_eq!(
            h.platform.state().removed_reactions.last(),
            Some(&(MessageId(1), UserId(5), "🎫".to_string()))
        );
    }

    #[tokio::test]
    async fn reaction_is_taken_back_before_the_panel_lookup() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Need help?", "React below", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);
        panels.delete_panel(created.id).await.unwrap();

        let stale = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🎫")).await.unwrap();
        assert_eq!(stale, None);
        assert_eq!(
            h.platform.state().removed_reactions,
            vec![(message_id, UserId(5), "🎫".to_string())]
        );
        assert!(open_tickets(&h.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_reaction_removal_is_not_fatal() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Need help?", "React below", &[("🎫".to_string(), billing.id), ("❓".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);
        h.platform.state().fail_reaction_removal = true;

        let opened = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🎫")).await.unwrap();
        assert!(opened.is_some());
        panels.unbind_reaction(created.id, "❓").await.unwrap();
        assert_eq!(panels.list_panels().await.unwrap()[0].1.len(), 1);
        assert!(h.platform.state().removed_reactions.is_empty());
    }

    #[tokio::test]
    async fn missing_ticket_category_is_ignored() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Need help?", "React below", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);
        h.platform.remove_channel(h.category);

        let opened = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🎫")).await.unwrap();
        assert_eq!(opened, None);
        h.settings.clear(SettingKey::TicketCategory).await.unwrap();
        let opened = panels.dispatch_reaction(&reaction(message_id, h.lobby, 5, "🎫")).await.unwrap();
        assert_eq!(opened, None);
        assert!(open_tickets(&h.db).await.unwrap().is_empty());
        assert_eq!(h.platform.state().removed_reactions.len(), 2);
    }

    #[tokio::test]
    async fn create_panel_validates_first() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let bad_emoji = panels
            .create_panel(h.lobby, "T", "C", &[("ticket".to_string(), billing.id)])
            .await
            .unwrap_err();
        assert!(matches!(bad_emoji, Error::InvalidInput(_)));
        let bad_category = panels
            .create_panel(h.lobby, "T", "C", &[("🎫".to_string(), billing.id + 1)])
            .await
            .unwrap_err();
        assert!(bad_category.is_not_found());
        let not_text = panels
            .create_panel(h.category, "T", "C", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap_err();
        assert!(matches!(not_text, Error::InvalidInput(_)));
        assert!(h.platform.state().sent.is_empty());
        assert!(panels.list_panels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_skips_vanished_panels() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let kept = panels
            .create_panel(h.lobby, "Kept", "", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        let gone = panels
            .create_panel(h.archive, "Gone", "", &[("❓".to_string(), billing.id)])
            .await
            .unwrap();
        panels.bind_reaction(kept.id, "🧾", billing.id).await.unwrap();
        h.platform.remove_channel(h.archive);
        h.platform.state().added_reactions.clear();

        assert_eq!(panels.refresh_all().await.unwrap(), 1);
        let kept_message = MessageId(kept.message_id.unwrap() as u64);
        assert_eq!(
            h.platform.state().added_reactions,
            vec![(kept_message, "🎫".to_string()), (kept_message, "🧾".to_string())]
        );
        assert_eq!(panels.list_panels().await.unwrap().len(), 2);
        assert!(gone.message_id.is_some());
    }

    #[tokio::test]
    async fn refresh_loop_runs_until_stopped() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_millis(50));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        panels
            .create_panel(h.lobby, "Kept", "", &[("🎫".to_string(), billing.id)])
            .await
            .unwrap();
        h.platform.state().added_reactions.clear();

        panels.start().await.unwrap();
        wait_until("two refresh passes", || h.platform.state().added_reactions.len() >= 2).await;
        panels.stop().await;
        assert!(panels.refresher.lock().await.is_none());
        // Stopping joins the loop: nothing refreshes afterwards.
        let after_stop = h.platform.state().added_reactions.len();
        assert_eq!(panels.refresh_all().await.unwrap(), 1);
        assert_eq!(h.platform.state().added_reactions.len(), after_stop + 1);
        panels.stop().await;
    }

    #[tokio::test]
    async fn unbind_and_delete() {
        let h = harness().await;
        let panels = panels(&h, Duration::from_secs(3600));
        let billing = create_category(&h.db, "Billing").await.unwrap();
        let created = panels
            .create_panel(h.lobby, "Kept", "", &[("🎫".to_string(), billing.id), ("❓".to_string(), billing.id)])
            .await
            .unwrap();
        let message_id = MessageId(created.message_id.unwrap() as u64);

        panels.unbind_reaction(created.id, "❓").await.unwrap();
        assert_eq!(
            h.platform.state().removed_reactions,
            vec![(message_id, BOT, "❓".to_string())]
        );
        let listed = panels.list_panels().await.unwrap();
        assert_eq!(listed[0].1.len(), 1);

        panels.delete_panel(created.id).await.unwrap();
        assert!(panels.list_panels().await.unwrap().is_empty());
        assert!(h.platform.state().deleted_messages.contains(&message_id));
        assert!(panels.delete_panel(created.id).await.unwrap_err().is_not_found());
    }
}
