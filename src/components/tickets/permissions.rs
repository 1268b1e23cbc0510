//! Who can see a ticket.

use std::collections::HashSet;

use serenity::model::{
    id::{RoleId, UserId},
    permissions::Permissions,
};

use crate::{
    error::Result,
    platform::{Overwrite, Overwrites, Principal},
    settings::{SettingKey, Settings},
};

/// Roles whose members take part in every ticket.
pub const TICKET_ROLE_KEYS: [SettingKey; 2] = [SettingKey::MentionRole, SettingKey::PanelAccessRole];

/// Granted to every participant of a ticket.
pub fn ticket_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::READ_MESSAGE_HISTORY
        | Permissions::SEND_MESSAGES
        | Permissions::ADD_REACTIONS
}

pub async fn ticket_roles(settings: &Settings) -> Result<HashSet<RoleId>> {
    Ok(settings
        .get_multiple(&TICKET_ROLE_KEYS)
        .await?
        .into_iter()
        .map(RoleId)
        .collect())
}

/// Configured mention and panel-access roles. Read failures are propagated.
pub async fn resolve_ticket_principals(settings: &Settings) -> Result<HashSet<Principal>> {
    Ok(ticket_roles(settings).await?.into_iter().map(Principal::Role).collect())
}

/// Overwrites of a new ticket channel: participants in, everyone else out.
pub fn build_overwrites(principals: &HashSet<Principal>, creator: UserId) -> Overwrites {
    let granted = Overwrite {
        allow: ticket_permissions(),
        deny: Permissions::empty(),
    };
    let mut overwrites = principals
        .iter()
        .filter(|p| **p != Principal::Everyone)
        .map(|p| (*p, granted))
        .collect::<Overwrites>();
    overwrites.insert(Principal::Member(creator), granted);
    overwrites.insert(
        Principal::Everyone,
        Overwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
        },
    );
    overwrites
}
