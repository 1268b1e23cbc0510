use sea_orm::{entity::*, query::*, ConnectionTrait, PaginatorTrait};

use crate::{
    db::{model, RowID},
    error::{Error, Result},
    log_info,
};

const NAME_MAX_LEN: usize = 64;

fn check_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_LEN {
        return Err(Error::invalid(format!("A category name is 1 to {} characters long", NAME_MAX_LEN)));
    }
    Ok(name.to_string())
}

async fn check_unique<C: ConnectionTrait>(connector: &C, name: &str) -> Result<()> {
    let existing = model::Category::find()
        .filter(model::category::Column::Name.eq(name))
        .one(connector)
        .await?;
    match existing {
        Some(_) => Err(Error::Conflict(format!("Category `{}` already exists", name))),
        None => Ok(()),
    }
}

pub async fn create_category<C: ConnectionTrait>(connector: &C, name: &str) -> Result<model::category::Model> {
    let name = check_name(name)?;
    check_unique(connector, &name).await?;
    let category = model::category::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(connector)
    .await?;
    log_info!("Category {} ({}) created", category.id, category.name);
    Ok(category)
}

pub async fn rename_category<C: ConnectionTrait>(connector: &C, id: RowID, name: &str) -> Result<model::category::Model> {
    let name = check_name(name)?;
    let category = find_category(connector, id).await?;
    if category.name == name {
        return Ok(category);
    }
    check_unique(connector, &name).await?;
    let mut active: model::category::ActiveModel = category.into();
    active.name = Set(name);
    Ok(active.update(connector).await?)
}

pub async fn find_category<C: ConnectionTrait>(connector: &C, id: RowID) -> Result<model::category::Model> {
    model::Category::find_by_id(id)
        .one(connector)
        .await?
        .ok_or_else(|| Error::not_found(format!("Category {} not found", id)))
}

pub async fn list_categories<C: ConnectionTrait>(connector: &C) -> Result<Vec<model::category::Model>> {
    Ok(model::Category::find()
        .order_by_asc(model::category::Column::Id)
        .all(connector)
        .await?)
}

/// Delete a category nothing refers to anymore.
pub async fn delete_category<C: ConnectionTrait>(connector: &C, id: RowID) -> Result<()> {
    find_category(connector, id).await?;
    let tickets = model::Ticket::find()
        .filter(model::ticket::Column::CategoryId.eq(id))
        .count(connector)
        .await?;
    let reactions = model::Reaction::find()
        .filter(model::reaction::Column::CategoryId.eq(id))
        .count(connector)
        .await?;
    if tickets > 0 || reactions > 0 {
        return Err(Error::Conflict(format!(
            "Category {} is still used by {} ticket(s) and {} panel reaction(s)",
            id, tickets, reactions
        )));
    }
    model::Category::delete_by_id(id).exec(connector).await?;
    log_info!("Category {} removed", id);
    Ok(())
}
