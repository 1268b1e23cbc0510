use sea_orm::entity::prelude::*;

use crate::db::{model::{category, message, user}, IDType, RowID};

/// Longest reason accepted when a ticket is opened.
pub const REASON_MAX_LEN: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: RowID,
    /// Channel hosting the ticket. Absent until the channel exists, never repointed after.
    pub channel_id: Option<IDType>,
    pub category_id: Option<RowID>,
    pub creator_id: IDType,
    /// Once false, stays false.
    pub is_open: bool,
    #[sea_orm(column_type = "String(Some(256))")]
    pub reason: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "category::Entity",
        from = "Column::CategoryId",
        to = "category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::CreatorId",
        to = "user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "message::Entity")]
    Messages,
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}
impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}
impl Related<message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
