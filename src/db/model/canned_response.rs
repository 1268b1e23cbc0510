use sea_orm::entity::prelude::*;

use crate::db::RowID;

/// Prepared answer posted with `<prefix><key>`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "canned_response")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: RowID,
    #[sea_orm(unique, column_type = "String(Some(32))")]
    pub key: String,
    #[sea_orm(column_type = "String(Some(256))")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// Object of field name to field content, in display order.
    pub fields: Json,
}

impl Model {
    pub fn field_list(&self) -> Vec<(String, String)> {
        match self.fields.as_object() {
            Some(fields) => fields
                .iter()
                .map(|(name, value)| (name.clone(), value.as_str().unwrap_or_default().to_string()))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
