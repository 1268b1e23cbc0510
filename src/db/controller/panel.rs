use sea_orm::{entity::*, query::*, sea_query::Expr, ConnectionTrait, DbConn, TransactionTrait};
use serenity::model::id::{ChannelId, MessageId};

use crate::{
    db::{controller::category::find_category, model, IDType, RowID},
    error::{Error, Result},
    log_info,
};

/// Store a panel and its bindings. Every category must exist.
pub async fn create_panel(
    db: &DbConn,
    channel_id: ChannelId,
    title: &str,
    content: &str,
    bindings: &[(String, RowID)],
) -> Result<model::panel::Model> {
    let txn = db.begin().await?;
    for (_, category_id) in bindings {
        find_category(&txn, *category_id).await?;
    }
    let panel = model::panel::ActiveModel {
        channel_id: Set(channel_id.0 as IDType),
        message_id: Set(None),
        title: Set(title.to_string()),
        content: Set(content.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    for (emoji, category_id) in bindings {
        insert_binding(&txn, panel.id, emoji, *category_id).await?;
    }
    txn.commit().await?;
    log_info!("Panel {} created with {} reaction(s)", panel.id, bindings.len());
    Ok(panel)
}

async fn insert_binding<C: ConnectionTrait>(connector: &C, panel_id: RowID, emoji: &str, category_id: RowID) -> Result<model::reaction::Model> {
    Ok(model::reaction::ActiveModel {
        emoji: Set(emoji.to_string()),
        panel_id: Set(panel_id),
        category_id: Set(category_id),
        ..Default::default()
    }
    .insert(connector)
    .await?)
}

pub async fn set_panel_message<C: ConnectionTrait>(connector: &C, panel_id: RowID, message_id: MessageId) -> Result<()> {
    model::Panel::update_many()
        .col_expr(model::panel::Column::MessageId, Expr::value(message_id.0 as IDType))
        .filter(model::panel::Column::Id.eq(panel_id))
        .exec(connector)
        .await?;
    Ok(())
}

pub async fn find_panel<C: ConnectionTrait>(connector: &C, panel_id: RowID) -> Result<model::panel::Model> {
    model::Panel::find_by_id(panel_id)
        .one(connector)
        .await?
        .ok_or_else(|| Error::not_found(format!("Panel {} not found", panel_id)))
}

pub async fn find_panel_by_message<C: ConnectionTrait>(connector: &C, message_id: MessageId) -> Result<Option<model::panel::Model>> {
    Ok(model::Panel::find()
        .filter(model::panel::Column::MessageId.eq(message_id.0 as IDType))
        .one(connector)
        .await?)
}

pub async fn list_panels<C: ConnectionTrait>(connector: &C) -> Result<Vec<model::panel::Model>> {
    Ok(model::Panel::find()
        .order_by_asc(model::panel::Column::Id)
        .all(connector)
        .await?)
}

pub async fn panel_reactions<C: ConnectionTrait>(connector: &C, panel_id: RowID) -> Result<Vec<model::reaction::Model>> {
    Ok(model::Reaction::find()
        .filter(model::reaction::Column::PanelId.eq(panel_id))
        .order_by_asc(model::reaction::Column::Id)
        .all(connector)
        .await?)
}

/// First binding of `emoji` on the panel.
pub async fn find_binding<C: ConnectionTrait>(connector: &C, panel_id: RowID, emoji: &str) -> Result<Option<model::reaction::Model>> {
    Ok(model::Reaction::find()
        .filter(model::reaction::Column::PanelId.eq(panel_id))
        .filter(model::reaction::Column::Emoji.eq(emoji))
        .order_by_asc(model::reaction::Column::Id)
        .one(connector)
        .await?)
}

pub async fn bind_reaction<C: ConnectionTrait>(connector: &C, panel_id: RowID, emoji: &str, category_id: RowID) -> Result<model::reaction::Model> {
    find_panel(connector, panel_id).await?;
    find_category(connector, category_id).await?;
    insert_binding(connector, panel_id, emoji, category_id).await
}

/// Remove every binding of `emoji` on the panel.
pub async fn unbind_reaction<C: ConnectionTrait>(connector: &C, panel_id: RowID, emoji: &str) -> Result<u64> {
    let res = model::Reaction::delete_many()
        .filter(model::reaction::Column::PanelId.eq(panel_id))
        .filter(model::reaction::Column::Emoji.eq(emoji))
        .exec(connector)
        .await?;
    if res.rows_affected == 0 {
        return Err(Error::not_found(format!("Panel {} has no {} reaction", panel_id, emoji)));
    }
    Ok(res.rows_affected)
}

/// Delete a panel with its bindings. Returns the deleted row.
pub async fn delete_panel(db: &DbConn, panel_id: RowID) -> Result<model::panel::Model> {
    let txn = db.begin().await?;
    let panel = find_panel(&txn, panel_id).await?;
    model::Reaction::delete_many()
        .filter(model::reaction::Column::PanelId.eq(panel_id))
        .exec(&txn)
        .await?;
    model::Panel::delete_by_id(panel_id).exec(&txn).await?;
    txn.commit().await?;
    log_info!("Panel {} deleted", panel_id);
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::controller::category::create_category, testing::memory_db};

    #[tokio::test]
    async fn unknown_category_stores_nothing() {
        let db = memory_db().await;
        let support = create_category(&db, "Support").await.unwrap();
        let bindings = vec![("🎫".to_string(), support.id), ("❓".to_string(), support.id + 10)];
        let err = create_panel(&db, ChannelId(5), "Help", "React", &bindings).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(list_panels(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_binding_wins_and_delete_cascades() {
        let db = memory_db().await;
        let first = create_category(&db, "First").await.unwrap();
        let second = create_category(&db, "Second").await.unwrap();
        let panel = create_panel(&db, ChannelId(5), "Help", "React", &[("🎫".to_string(), first.id)])
            .await
            .unwrap();
        bind_reaction(&db, panel.id, "🎫", second.id).await.unwrap();
        set_panel_message(&db, panel.id, MessageId(77)).await.unwrap();

        let found = find_panel_by_message(&db, MessageId(77)).await.unwrap().unwrap();
        assert_eq!(found.id, panel.id);
        let binding = find_binding(&db, panel.id, "🎫").await.unwrap().unwrap();
        assert_eq!(binding.category_id, first.id);
        assert!(find_binding(&db, panel.id, "❓").await.unwrap().is_none());

        delete_panel(&db, panel.id).await.unwrap();
        assert!(panel_reactions(&db, panel.id).await.unwrap().is_empty());
        assert!(find_panel_by_message(&db, MessageId(77)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unbind_missing_reaction_is_not_found() {
        let db = memory_db().await;
        let category = create_category(&db, "Support").await.unwrap();
        let panel = create_panel(&db, ChannelId(5), "Help", "React", &[("🎫".to_string(), category.id)])
            .await
            .unwrap();
        assert!(unbind_reaction(&db, panel.id, "❓").await.unwrap_err().is_not_found());
        assert_eq!(unbind_reaction(&db, panel.id, "🎫").await.unwrap(), 1);
        assert!(bind_reaction(&db, panel.id + 1, "🎫", category.id).await.unwrap_err().is_not_found());
    }
}
