use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, ConnectionTrait};
use serenity::model::id::{ChannelId, UserId};

use crate::{
    db::{model, IDType, RowID},
    error::{Error, Result},
    log_info,
};

/// Insert an open ticket with no channel yet.
pub async fn create_ticket<C: ConnectionTrait>(
    connector: &C,
    creator: UserId,
    category_id: Option<RowID>,
    reason: Option<String>,
) -> Result<model::ticket::Model> {
    let ticket = model::ticket::ActiveModel {
        channel_id: Set(None),
        category_id: Set(category_id),
        creator_id: Set(creator.0 as IDType),
        is_open: Set(true),
        reason: Set(reason),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(connector)
    .await?;
    log_info!("Ticket {} created by {}", ticket.id, creator);
    Ok(ticket)
}

/// Attach the hosting channel. A ticket already linked to a channel keeps it.
pub async fn attach_channel<C: ConnectionTrait>(connector: &C, ticket_id: RowID, channel_id: ChannelId) -> Result<()> {
    let res = model::Ticket::update_many()
        .col_expr(model::ticket::Column::ChannelId, Expr::value(channel_id.0 as IDType))
        .filter(model::ticket::Column::Id.eq(ticket_id))
        .filter(model::ticket::Column::ChannelId.is_null())
        .exec(connector)
        .await?;
    if res.rows_affected == 0 {
        return match find_ticket(connector, ticket_id).await? {
            Some(_) => Err(Error::Conflict(format!("Ticket {} already has a channel", ticket_id))),
            None => Err(Error::not_found(format!("Ticket {} not found", ticket_id))),
        };
    }
    Ok(())
}

pub async fn find_ticket<C: ConnectionTrait>(connector: &C, ticket_id: RowID) -> Result<Option<model::ticket::Model>> {
    Ok(model::Ticket::find_by_id(ticket_id).one(connector).await?)
}

pub async fn find_by_channel<C: ConnectionTrait>(connector: &C, channel_id: ChannelId) -> Result<Option<model::ticket::Model>> {
    Ok(model::Ticket::find()
        .filter(model::ticket::Column::ChannelId.eq(channel_id.0 as IDType))
        .order_by_desc(model::ticket::Column::Id)
        .one(connector)
        .await?)
}

pub async fn open_tickets<C: ConnectionTrait>(connector: &C) -> Result<Vec<model::ticket::Model>> {
    Ok(model::Ticket::find()
        .filter(model::ticket::Column::IsOpen.eq(true))
        .order_by_asc(model::ticket::Column::Id)
        .all(connector)
        .await?)
}

/// Close the ticket if it is still open. Returns false when it already was closed.
pub async fn mark_closed<C: ConnectionTrait>(connector: &C, ticket_id: RowID) -> Result<bool> {
    let res = model::Ticket::update_many()
        .col_expr(model::ticket::Column::IsOpen, Expr::value(false))
        .filter(model::ticket::Column::Id.eq(ticket_id))
        .filter(model::ticket::Column::IsOpen.eq(true))
        .exec(connector)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Close every open ticket whose channel is absent or not in `live_channels`.
pub async fn close_missing<C: ConnectionTrait>(connector: &C, live_channels: &[ChannelId]) -> Result<u64> {
    let mut query = model::Ticket::update_many()
        .col_expr(model::ticket::Column::IsOpen, Expr::value(false))
        .filter(model::ticket::Column::IsOpen.eq(true));
    if !live_channels.is_empty() {
        let ids = live_channels.iter().map(|c| c.0 as IDType).collect::<Vec<_>>();
        query = query.filter(
            Condition::any()
                .add(model::ticket::Column::ChannelId.is_null())
                .add(model::ticket::Column::ChannelId.is_not_in(ids)),
        );
    }
    let res = query.exec(connector).await?;
    Ok(res.rows_affected)
}

pub async fn save_message<C: ConnectionTrait>(
    connector: &C,
    ticket_id: RowID,
    sender: UserId,
    content: &str,
) -> Result<model::message::Model> {
    Ok(model::message::ActiveModel {
        ticket_id: Set(ticket_id),
        sender_id: Set(sender.0 as IDType),
        content: Set(content.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(connector)
    .await?)
}

/// Messages of a ticket, oldest first.
pub async fn ticket_messages<C: ConnectionTrait>(connector: &C, ticket_id: RowID) -> Result<Vec<model::message::Model>> {
    Ok(model::Message::find()
        .filter(model::message::Column::TicketId.eq(ticket_id))
        .order_by_asc(model::message::Column::Id)
        .all(connector)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::controller::discord::save_user, testing::memory_db};

    async fn ticket(db: &sea_orm::DbConn, channel: Option<u64>) -> model::ticket::Model {
        save_user(db, UserId(1), "u#0001", "").await.unwrap();
        let ticket = create_ticket(db, UserId(1), None, None).await.unwrap();
        if let Some(channel) = channel {
            attach_channel(db, ticket.id, ChannelId(channel)).await.unwrap();
        }
        ticket
    }

    #[tokio::test]
    async fn channel_is_never_repointed() {
        let db = memory_db().await;
        let t = ticket(&db, Some(50)).await;
        let err = attach_channel(&db, t.id, ChannelId(51)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(attach_channel(&db, 999, ChannelId(51)).await.unwrap_err().is_not_found());
        assert_eq!(find_by_channel(&db, ChannelId(50)).await.unwrap().unwrap().id, t.id);
    }

    #[tokio::test]
    async fn close_is_terminal() {
        let db = memory_db().await;
        let t = ticket(&db, Some(50)).await;
        assert!(mark_closed(&db, t.id).await.unwrap());
        assert!(!mark_closed(&db, t.id).await.unwrap());
        assert!(!find_ticket(&db, t.id).await.unwrap().unwrap().is_open);
    }

    #[tokio::test]
    async fn close_missing_handles_channelless_tickets() {
        let db = memory_db().await;
        let live = ticket(&db, Some(50)).await;
        let gone = ticket(&db, Some(51)).await;
        let orphan = ticket(&db, None).await;

        assert_eq!(close_missing(&db, &[ChannelId(50)]).await.unwrap(), 2);
        assert_eq!(close_missing(&db, &[ChannelId(50)]).await.unwrap(), 0);
        assert!(find_ticket(&db, live.id).await.unwrap().unwrap().is_open);
        assert!(!find_ticket(&db, gone.id).await.unwrap().unwrap().is_open);
        assert!(!find_ticket(&db, orphan.id).await.unwrap().unwrap().is_open);

        assert_eq!(close_missing(&db, &[]).await.unwrap(), 1);
        assert!(open_tickets(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_keep_insertion_order() {
        let db = memory_db().await;
        let t = ticket(&db, Some(50)).await;
        save_user(&db, UserId(2), "v#0002", "").await.unwrap();
        save_message(&db, t.id, UserId(1), "hello").await.unwrap();
        save_message(&db, t.id, UserId(2), "hi there").await.unwrap();
        let messages = ticket_messages(&db, t.id).await.unwrap();
        let seen = messages.iter().map(|m| (m.sender_id, m.content.as_str())).collect::<Vec<_>>();
        assert_eq!(seen, vec![(1, "hello"), (2, "hi there")]);
    }
}
