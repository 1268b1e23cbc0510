use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use ticketbot_core::message::{Message, COLOR_DEFAULT};

use crate::db::model::ticket;

const TIME_FORMAT: &str = "%H:%M:%S %m/%d/%Y (UTC)";

/// Summary posted in the archive channel once a ticket is closed.
pub fn archive_card(ticket: &ticket::Model, closed_by: UserId, closed_at: DateTime<Utc>) -> Message {
    let mut msg = Message::new();
    msg.add_embed(|e| {
        e.title("Ticket Closed")
            .color(COLOR_DEFAULT)
            .field("Ticket ID", ticket.id, true)
            .field("Opened By", format!("<@{}>", ticket.creator_id), true)
            .field("Closed By", format!("<@{}>", closed_by.0), true)
            .field("Opened At", ticket.created_at.format(TIME_FORMAT), false)
            .field("Closed At", closed_at.format(TIME_FORMAT), false);
        if let Some(reason) = &ticket.reason {
            e.field("Reason", reason, false);
        }
        e
    });
    msg.silent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn card_fields() {
        let ticket = ticket::Model {
            id: 7,
            channel_id: Some(50),
            category_id: None,
            creator_id: 12,
            is_open: false,
            reason: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 8, 5, 9).unwrap(),
        };
        let closed_at = Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap();
        let msg = archive_card(&ticket, UserId(34), closed_at);
        assert!(!msg.allow_mentions);
        let embed = msg.last_embed().unwrap();
        assert_eq!(embed.get_field("Ticket ID"), Some("7"));
        assert_eq!(embed.get_field("Opened By"), Some("<@12>"));
        assert_eq!(embed.get_field("Closed By"), Some("<@34>"));
        assert_eq!(embed.get_field("Opened At"), Some("08:05:09 03/02/2024 (UTC)"));
        assert_eq!(embed.get_field("Closed At"), Some("10:00:00 03/03/2024 (UTC)"));
        assert_eq!(embed.get_field("Reason"), None);
    }
}
