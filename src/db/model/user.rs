use sea_orm::entity::prelude::*;

use crate::db::{model::{message, ticket}, IDType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "discord_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: IDType,
    /// `name#discriminator`
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub avatar: String,
    /// Allowed to log into the web panel.
    pub has_panel: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "ticket::Entity")]
    OpenedTickets,
    #[sea_orm(has_many = "message::Entity")]
    Messages,
}

impl Related<ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpenedTickets.def()
    }
}
impl Related<message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
