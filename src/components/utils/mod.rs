//! Helpers shared by the components.

pub mod task;
pub mod time_parser;

use serenity::model::id::{ChannelId, UserId};

/// Read a user id from a raw id or a mention (`<@123>`, `<@!123>`).
pub fn parse_user_id(arg: &str) -> Option<UserId> {
    lazy_static::lazy_static!(
        static ref RE_MENTION: regex::Regex = regex::Regex::new(r"^<@!?(\d+)>$").unwrap();
    );
    let raw = match RE_MENTION.captures(arg) {
        Some(caps) => caps.get(1)?.as_str(),
        None => arg,
    };
    raw.parse::<u64>().ok().filter(|id| *id != 0).map(UserId)
}

/// Read a channel id from a raw id or a channel mention (`<#123>`).
pub fn parse_channel_id(arg: &str) -> Option<ChannelId> {
    let raw = arg
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(arg);
    raw.parse::<u64>().ok().filter(|id| *id != 0).map(ChannelId)
}

/// Split a command line on spaces, keeping double-quoted parts together.
pub fn split_shell(txt: &str) -> Vec<&str> {
    let mut quoted = false;
    txt.split(|c| match (quoted, c) {
        (_, '"') => {
            quoted = !quoted;
            true
        }
        (false, ' ') => true,
        _ => false,
    })
    .filter(|s| !s.is_empty())
    .collect()
}
