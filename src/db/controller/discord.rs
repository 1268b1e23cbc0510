use sea_orm::{entity::*, sea_query::OnConflict, ConnectionTrait};
use serenity::model::id::UserId;

use crate::{
    db::{model, IDType},
    error::Result,
    log_debug,
};

/// Insert the user unless it is already known. Known users are left untouched.
pub async fn save_user<C: ConnectionTrait>(connector: &C, user_id: UserId, name: &str, avatar: &str) -> Result<IDType> {
    let db_user_id = user_id.0 as IDType;
    let active_model = model::user::ActiveModel {
        id: Set(db_user_id),
        name: Set(name.to_string()),
        avatar: Set(avatar.to_string()),
        has_panel: Set(false),
    };
    let inserted = model::User::insert(active_model)
        .on_conflict(OnConflict::column(model::user::Column::Id).do_nothing().to_owned())
        .exec_without_returning(connector)
        .await?;
    if inserted > 0 {
        log_debug!("User {} saved", db_user_id);
    }
    Ok(db_user_id)
}

pub async fn find_user<C: ConnectionTrait>(connector: &C, user_id: UserId) -> Result<Option<model::user::Model>> {
    Ok(model::User::find_by_id(user_id.0 as IDType).one(connector).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    #[tokio::test]
    async fn save_user_is_idempotent() {
        let db = memory_db().await;
        save_user(&db, UserId(5), "alice#0001", "https://a").await.unwrap();
        save_user(&db, UserId(5), "alice#0002", "https://b").await.unwrap();
        let user = find_user(&db, UserId(5)).await.unwrap().unwrap();
        assert_eq!(user.name, "alice#0001");
        assert!(!user.has_panel);
        assert_eq!(model::User::find().all(&db).await.unwrap().len(), 1);
    }
}
