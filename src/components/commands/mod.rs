//! Prefix commands.
//!
//! Every command is an entry of [`COMMANDS`]: a name, the checks run before it, and the
//! handler it maps to. The first failing check stops the invocation with its reason.
//! Any other `<prefix><key>` line posts the canned response stored under that key.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::DbConn;
use serenity::{
    async_trait,
    model::id::{ChannelId, GuildId},
};
use ticketbot_core::{
    message::{self, Message},
    BotEvent, Component, IncomingMessage,
};

use crate::{
    components::{
        panels::Panels,
        tickets::{CloseOutcome, Tickets},
        utils::{parse_channel_id, parse_user_id, split_shell, time_parser},
    },
    db::{
        controller::{canned, category},
        model, RowID,
    },
    error::{Error, Result},
    log_debug, log_error, log_info,
    platform::{Platform, UserProfile},
    settings::{SettingKey, SettingKind, Settings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// The author has one of the roles stored under these keys.
    HasRole(&'static [SettingKey]),
    /// The command runs in an open ticket channel.
    InTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Open,
    Close,
    Add,
    Remove,
    Rename,
    Voice,
    Sync,
    Category,
    Config,
    Panel,
    Canned,
    Help,
}

pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
    pub checks: &'static [Check],
    pub kind: CommandKind,
}

const TICKET_STAFF: &[SettingKey] = &[SettingKey::MentionRole, SettingKey::PanelAccessRole];
const PANEL_ACCESS: &[SettingKey] = &[SettingKey::PanelAccessRole];
const MANAGEMENT: &[SettingKey] = &[SettingKey::ManagementRole];

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "open",
        aliases: &["ticket"],
        usage: "open [reason]",
        description: "Open a new ticket",
        checks: &[],
        kind: CommandKind::Open,
    },
    CommandSpec {
        name: "close",
        aliases: &[],
        usage: "close [when]",
        description: "Close the ticket, now or later (`10min`, `2h`, `2024-05-01 18:00`)",
        checks: &[Check::HasRole(TICKET_STAFF), Check::InTicket],
        kind: CommandKind::Close,
    },
    CommandSpec {
        name: "add",
        aliases: &[],
        usage: "add <user>",
        description: "Add someone to the ticket",
        checks: &[Check::HasRole(TICKET_STAFF), Check::InTicket],
        kind: CommandKind::Add,
    },
    CommandSpec {
        name: "remove",
        aliases: &[],
        usage: "remove <user>",
        description: "Remove someone from the ticket",
        checks: &[Check::HasRole(TICKET_STAFF), Check::InTicket],
        kind: CommandKind::Remove,
    },
    CommandSpec {
        name: "rename",
        aliases: &[],
        usage: "rename <name>",
        description: "Rename the ticket",
        checks: &[Check::HasRole(TICKET_STAFF), Check::InTicket],
        kind: CommandKind::Rename,
    },
    CommandSpec {
        name: "voice",
        aliases: &[],
        usage: "voice",
        description: "Create a voice channel for the ticket",
        checks: &[Check::HasRole(TICKET_STAFF), Check::InTicket],
        kind: CommandKind::Voice,
    },
    CommandSpec {
        name: "sync",
        aliases: &[],
        usage: "sync",
        description: "Close the tickets whose channel is gone",
        checks: &[Check::HasRole(PANEL_ACCESS)],
        kind: CommandKind::Sync,
    },
    CommandSpec {
        name: "category",
        aliases: &[],
        usage: "category <add <name> | rename <id> <name> | remove <id> | list>",
        description: "Manage the ticket categories",
        checks: &[Check::HasRole(MANAGEMENT)],
        kind: CommandKind::Category,
    },
    CommandSpec {
        name: "config",
        aliases: &[],
        usage: "config <get | set | add | remove | clear> <key> [id]",
        description: "Read or change a setting",
        checks: &[Check::HasRole(MANAGEMENT)],
        kind: CommandKind::Config,
    },
    CommandSpec {
        name: "panel",
        aliases: &[],
        usage: "panel <create <channel> <title> <content> <emoji=category>... | bind <panel> <emoji> <category> | unbind <panel> <emoji> | delete <panel> | list>",
        description: "Manage the reaction panels",
        checks: &[Check::HasRole(MANAGEMENT)],
        kind: CommandKind::Panel,
    },
    CommandSpec {
        name: "canned",
        aliases: &[],
        usage: "canned <add <key> <title> <content> [name=content]... | remove <key> | list>",
        description: "Manage the canned responses, posted with `<key>`",
        checks: &[Check::HasRole(MANAGEMENT)],
        kind: CommandKind::Canned,
    },
    CommandSpec {
        name: "help",
        aliases: &[],
        usage: "help",
        description: "List the commands",
        checks: &[],
        kind: CommandKind::Help,
    },
];

/// Card of a canned response. Nobody is mentioned.
pub fn canned_card(response: &model::canned_response::Model) -> Message {
    let mut msg = Message::new();
    msg.add_embed(|e| {
        e.title(&response.title)
            .description(&response.content)
            .color(message::COLOR_DEFAULT);
        for (name, content) in response.field_list() {
            e.field(name, content, false);
        }
        e
    });
    msg.silent()
}

pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    let name = name.to_lowercase();
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.aliases.contains(&name.as_str()))
}

/// A parsed command line.
struct Invocation<'a> {
    msg: &'a IncomingMessage,
    guild: GuildId,
    spec: &'static CommandSpec,
    args: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    fn rest(&self, from: usize) -> String {
        self.args.iter().skip(from).copied().collect::<Vec<_>>().join(" ")
    }
    fn arg(&self, index: usize) -> Result<&'a str> {
        self.args.get(index).copied().ok_or_else(|| self.usage())
    }
    fn row_id(&self, index: usize) -> Result<RowID> {
        let raw = self.arg(index)?;
        raw.parse()
            .map_err(|_| Error::invalid(format!("`{}` is not a valid identifier", raw)))
    }
    fn usage(&self) -> Error {
        Error::invalid(format!("Usage: `{}`", self.spec.usage))
    }
}

pub struct Commands {
    prefix: String,
    db: DbConn,
    platform: Arc<dyn Platform>,
    settings: Arc<Settings>,
    tickets: Arc<Tickets>,
    panels: Arc<Panels>,
}

impl Commands {
    pub fn new(
        prefix: &str,
        db: DbConn,
        platform: Arc<dyn Platform>,
        settings: Arc<Settings>,
        tickets: Arc<Tickets>,
        panels: Arc<Panels>,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            db,
            platform,
            settings,
            tickets,
            panels,
        }
    }

    fn parse<'a>(&self, msg: &'a IncomingMessage) -> Option<Invocation<'a>> {
        if msg.author.bot {
            return None;
        }
        let guild = msg.guild_id?;
        let line = msg.content.strip_prefix(self.prefix.as_str())?;
        let mut args = split_shell(line);
        if args.is_empty() {
            return None;
        }
        let spec = find_command(args.remove(0))?;
        Some(Invocation { msg, guild, spec, args })
    }

    /// Run the command in `msg`, if any. Returns the reply to post in the channel.
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<Result<Option<Message>>> {
        match self.parse(msg) {
            Some(invocation) => {
                log_debug!("{} runs `{}`", msg.author.name, msg.content);
                Some(self.run(&invocation).await)
            }
            None => self.canned_reply(msg).await,
        }
    }

    /// Canned response named by the whole line after the prefix.
    async fn canned_reply(&self, msg: &IncomingMessage) -> Option<Result<Option<Message>>> {
        if msg.author.bot || msg.guild_id.is_none() {
            return None;
        }
        let key = msg.content.strip_prefix(self.prefix.as_str())?.trim();
        if key.is_empty() {
            return None;
        }
        match canned::find_canned(&self.db, key).await {
            Ok(Some(found)) => {
                log_debug!("{} posts the response `{}`", msg.author.name, key);
                Some(Ok(Some(canned_card(&found))))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }

    async fn run(&self, inv: &Invocation<'_>) -> Result<Option<Message>> {
        for check in inv.spec.checks {
            self.check(*check, inv).await?;
        }
        match inv.spec.kind {
            CommandKind::Open => self.open(inv).await.map(Some),
            CommandKind::Close => self.close(inv).await,
            CommandKind::Add => {
                let user = parse_user_id(inv.arg(0)?).ok_or_else(|| inv.usage())?;
                self.tickets.add_participant(inv.msg.channel_id, user).await?;
                Ok(Some(message::success(format!("Added <@{}> to the ticket!", user.0))))
            }
            CommandKind::Remove => {
                let user = parse_user_id(inv.arg(0)?).ok_or_else(|| inv.usage())?;
                self.tickets.remove_participant(inv.msg.channel_id, user).await?;
                Ok(Some(message::success(format!("Removed <@{}> from the ticket!", user.0))))
            }
            CommandKind::Rename => {
                let requested = inv.rest(0);
                if requested.is_empty() {
                    return Err(inv.usage());
                }
                let name = self.tickets.rename(inv.msg.channel_id, &requested).await?;
                Ok(Some(message::success(format!("Ticket renamed to `{}`", name))))
            }
            CommandKind::Voice => {
                let voice = self.tickets.create_voice(inv.msg.channel_id).await?;
                Ok(Some(message::success(format!("Voice channel created: <#{}>", voice.id.0))))
            }
            CommandKind::Sync => {
                let closed = self.tickets.sync(inv.guild).await?;
                Ok(Some(match closed {
                    0 => message::success("The database is already in sync!"),
                    n => message::success(format!("{} ticket(s) marked as closed!", n)),
                }))
            }
            CommandKind::Category => self.category(inv).await.map(Some),
            CommandKind::Config => self.config(inv).await.map(Some),
            CommandKind::Panel => self.panel(inv).await.map(Some),
            CommandKind::Canned => self.canned(inv).await.map(Some),
            CommandKind::Help => Ok(Some(self.help())),
        }
    }

    async fn check(&self, check: Check, inv: &Invocation<'_>) -> Result<()> {
        match check {
            Check::HasRole(keys) => {
                let allowed = self.settings.get_multiple(keys).await?;
                if inv.msg.member_roles.iter().any(|role| allowed.contains(&role.0)) {
                    Ok(())
                } else {
                    let names = keys.iter().map(|k| k.name()).collect::<Vec<_>>().join(" or ");
                    Err(Error::Forbidden(format!("You need the {} role to do this", names)))
                }
            }
            Check::InTicket => {
                let category = self.tickets.ticket_category().await?;
                let channel = self.platform.channel(inv.msg.channel_id).await?;
                if category.is_none() || channel.parent_id != category {
                    return Err(Error::not_found("This command only works inside a ticket"));
                }
                self.tickets.require_open(inv.msg.channel_id).await.map(|_| ())
            }
        }
    }

    async fn open(&self, inv: &Invocation<'_>) -> Result<Message> {
        let parent = self
            .tickets
            .ticket_category()
            .await?
            .ok_or_else(|| Error::Config("No ticket category is configured".to_string()))?;
        let author = &inv.msg.author;
        let creator = UserProfile {
            id: author.id,
            name: author.name.clone(),
            avatar: author.avatar.clone(),
        };
        let reason = Some(inv.rest(0));
        let (_, channel) = self.tickets.create_ticket(&creator, inv.guild, parent, None, reason).await?;
        Ok(message::success(format!("Your ticket has been created!\n\n<#{}>", channel.id.0)))
    }

    async fn close(&self, inv: &Invocation<'_>) -> Result<Option<Message>> {
        let when = inv.rest(0);
        let delay = if when.is_empty() {
            Duration::zero()
        } else {
            time_parser::parse_delay(&when, Utc::now())?
        };
        let channel = inv.msg.channel_id;
        let voice = self.tickets.find_voice(channel).await?;
        match self.tickets.close_ticket(inv.msg.author.id, channel, voice, delay).await? {
            // The channel is gone, nowhere to answer.
            CloseOutcome::Closed => Ok(None),
            CloseOutcome::Scheduled(_) => Ok(Some(message::success(format!(
                "This ticket will be closed in {}",
                time_parser::format_duration(delay)
            )))),
        }
    }

    async fn category(&self, inv: &Invocation<'_>) -> Result<Message> {
        match inv.arg(0)? {
            "add" => {
                let name = inv.rest(1);
                let created = category::create_category(&self.db, &name).await?;
                Ok(message::success(format!("Category `{}` created with id {}", created.name, created.id)))
            }
            "rename" => {
                let id = inv.row_id(1)?;
                let renamed = category::rename_category(&self.db, id, &inv.rest(2)).await?;
                Ok(message::success(format!("Category {} renamed to `{}`", renamed.id, renamed.name)))
            }
            "remove" => {
                let id = inv.row_id(1)?;
                category::delete_category(&self.db, id).await?;
                Ok(message::success(format!("Category {} removed", id)))
            }
            "list" => {
                let categories = category::list_categories(&self.db).await?;
                if categories.is_empty() {
                    return Ok(message::info("No category yet"));
                }
                let lines = categories
                    .iter()
                    .map(|c| format!("`{}` {}", c.id, c.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(message::custom_embed("Categories", lines, message::COLOR_INFO))
            }
            _ => Err(inv.usage()),
        }
    }

    async fn config(&self, inv: &Invocation<'_>) -> Result<Message> {
        let action = inv.arg(0)?;
        let key: SettingKey = inv.arg(1)?.parse()?;
        let value = || -> Result<u64> {
            let raw = inv.args.get(2).copied().ok_or_else(|| {
                Error::invalid(format!("`{}` needs an id, usage: `{}`", action, inv.spec.usage))
            })?;
            let raw = raw.trim_start_matches("<@&").trim_start_matches("<#").trim_end_matches('>');
            raw.parse()
                .map_err(|_| Error::invalid(format!("`{}` is not a valid id", raw)))
        };
        match action {
            "get" => {
                let shown = match key.kind() {
                    SettingKind::Scalar => self.settings.get(key).await?.map(|v| v.to_string()),
                    SettingKind::List => {
                        let values = self.settings.get_list(key).await?;
                        (!values.is_empty()).then(|| {
                            values.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
                        })
                    }
                };
                Ok(message::info(format!("{} = {}", key, shown.as_deref().unwrap_or("*unset*"))))
            }
            "set" => {
                let value = value()?;
                self.settings.set(key, value).await?;
                log_info!("Setting {} set to {}", key, value);
                Ok(message::success(format!("{} set to {}", key, value)))
            }
            "add" => {
                let value = value()?;
                self.settings.add(key, value).await?;
                Ok(message::success(format!("{} added to {}", value, key)))
            }
            "remove" => {
                let value = value()?;
                if !self.settings.remove(key, value).await? {
                    return Err(Error::not_found(format!("{} is not in {}", value, key)));
                }
                Ok(message::success(format!("{} removed from {}", value, key)))
            }
            "clear" => {
                self.settings.clear(key).await?;
                Ok(message::success(format!("{} cleared", key)))
            }
            _ => Err(inv.usage()),
        }
    }

    async fn panel(&self, inv: &Invocation<'_>) -> Result<Message> {
        match inv.arg(0)? {
            "create" => {
                let channel: ChannelId = parse_channel_id(inv.arg(1)?).ok_or_else(|| inv.usage())?;
                let title = inv.arg(2)?;
                let content = inv.arg(3)?;
                let bindings = inv
                    .args
                    .iter()
                    .skip(4)
                    .map(|raw| {
                        let (emoji, category) = raw.rsplit_once('=').ok_or_else(|| inv.usage())?;
                        let category = category
                            .parse::<RowID>()
                            .map_err(|_| Error::invalid(format!("`{}` is not a valid category id", category)))?;
                        Ok((emoji.to_string(), category))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let created = self.panels.create_panel(channel, title, content, &bindings).await?;
                Ok(message::success(format!("Panel {} posted in <#{}>", created.id, channel.0)))
            }
            "bind" => {
                let panel = inv.row_id(1)?;
                let emoji = inv.arg(2)?;
                let category = inv.row_id(3)?;
                self.panels.bind_reaction(panel, emoji, category).await?;
                Ok(message::success(format!("{} now opens category {} on panel {}", emoji, category, panel)))
            }
            "unbind" => {
                let panel = inv.row_id(1)?;
                let emoji = inv.arg(2)?;
                self.panels.unbind_reaction(panel, emoji).await?;
                Ok(message::success(format!("{} removed from panel {}", emoji, panel)))
            }
            "delete" => {
                let panel = inv.row_id(1)?;
                self.panels.delete_panel(panel).await?;
                Ok(message::success(format!("Panel {} deleted", panel)))
            }
            "list" => {
                let panels = self.panels.list_panels().await?;
                if panels.is_empty() {
                    return Ok(message::info("No panel yet"));
                }
                let mut msg = Message::new();
                msg.add_embed(|e| {
                    e.title("Panels").color(message::COLOR_INFO);
                    for (panel, reactions) in &panels {
                        let bindings = reactions
                            .iter()
                            .map(|r| format!("{} → {}", r.emoji, r.category_id))
                            .collect::<Vec<_>>()
                            .join(", ");
                        e.field(
                            format!("{} · {}", panel.id, panel.title),
                            format!("<#{}> {}", panel.channel_id, bindings),
                            false,
                        );
                    }
                    e
                });
                Ok(msg)
            }
            _ => Err(inv.usage()),
        }
    }

    async fn canned(&self, inv: &Invocation<'_>) -> Result<Message> {
        match inv.arg(0)? {
            "add" => {
                let key = inv.arg(1)?;
                if find_command(key).is_some() {
                    return Err(Error::Conflict(format!("`{}` is already a command", key)));
                }
                let title = inv.arg(2)?;
                let content = inv.arg(3)?;
                let fields = inv
                    .args
                    .iter()
                    .skip(4)
                    .map(|raw| {
                        let (name, content) = raw.split_once('=').ok_or_else(|| inv.usage())?;
                        Ok((name.to_string(), content.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let created = canned::create_canned(&self.db, key, title, content, &fields).await?;
                Ok(message::success(format!("Response `{}{}` created", self.prefix, created.key)))
            }
            "remove" => {
                let key = inv.arg(1)?;
                canned::delete_canned(&self.db, key).await?;
                Ok(message::success(format!("Response `{}` removed", key)))
            }
            "list" => {
                let responses = canned::list_canned(&self.db).await?;
                if responses.is_empty() {
                    return Ok(message::info("No canned response yet"));
                }
                let lines = responses
                    .iter()
                    .map(|r| format!("`{}{}` {}", self.prefix, r.key, r.title))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(message::custom_embed("Canned responses", lines, message::COLOR_INFO))
            }
            _ => Err(inv.usage()),
        }
    }

    fn help(&self) -> Message {
        let mut msg = Message::new();
        msg.add_embed(|e| {
            e.title("Commands").color(message::COLOR_INFO);
            for spec in COMMANDS {
                e.field(format!("{}{}", self.prefix, spec.usage), spec.description, false);
            }
            e
        });
        msg
    }
}

#[async_trait]
impl Component for Commands {
    fn name(&self) -> &'static str {
        "commands"
    }
    async fn event(&self, event: &BotEvent) {
        let msg = match event {
            BotEvent::MessageCreate(msg) => msg,
            _ => return,
        };
        let reply = match self.handle(msg).await {
            None => return,
            Some(Ok(None)) => return,
            Some(Ok(Some(reply))) => reply,
            Some(Err(e)) => {
                match &e {
                    Error::NotFound(_) | Error::Conflict(_) | Error::InvalidInput(_) | Error::Forbidden(_) => {
                        log_debug!("`{}` rejected: {}", msg.content, e)
                    }
                    _ => log_error!("`{}` failed: {}", msg.content, e),
                }
                message::error(e)
            }
        };
        if let Err(e) = self.platform.send_message(msg.channel_id, reply.silent()).await {
            log_error!("Cannot reply in {}: {}", msg.channel_id, e);
        }
    }
}
