use sea_orm::entity::prelude::*;

use crate::db::{model::{category, panel}, RowID};

/// Emoji of a panel opening a ticket in a category.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "panel_reaction")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: RowID,
    #[sea_orm(column_type = "String(Some(64))")]
    pub emoji: String,
    pub panel_id: RowID,
    pub category_id: RowID,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "panel::Entity",
        from = "Column::PanelId",
        to = "panel::Column::Id",
        on_delete = "Cascade"
    )]
    Panel,
    #[sea_orm(
        belongs_to = "category::Entity",
        from = "Column::CategoryId",
        to = "category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,
}

impl Related<panel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Panel.def()
    }
}
impl Related<category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
