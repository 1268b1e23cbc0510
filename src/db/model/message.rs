use sea_orm::entity::prelude::*;

use crate::db::{model::{ticket, user}, IDType, RowID};

/// Chat message mirrored from a ticket channel.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ticket_message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: RowID,
    pub ticket_id: RowID,
    pub sender_id: IDType,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "ticket::Entity",
        from = "Column::TicketId",
        to = "ticket::Column::Id"
    )]
    Ticket,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::SenderId",
        to = "user::Column::Id"
    )]
    Sender,
}

impl Related<ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}
impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
