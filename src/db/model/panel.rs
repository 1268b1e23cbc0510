use sea_orm::entity::prelude::*;

use crate::db::{model::reaction, IDType, RowID};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "panel")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: RowID,
    pub channel_id: IDType,
    /// Set once the card is posted.
    pub message_id: Option<IDType>,
    #[sea_orm(column_type = "String(Some(256))")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "reaction::Entity")]
    Reactions,
}

impl Related<reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
