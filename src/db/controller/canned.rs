use sea_orm::{entity::*, query::*, ConnectionTrait};

use crate::{
    db::model,
    error::{Error, Result},
    log_info,
};

const KEY_MAX_LEN: usize = 32;
const TITLE_MAX_LEN: usize = 256;
const CONTENT_MAX_LEN: usize = 4096;
const FIELD_NAME_MAX_LEN: usize = 256;
const FIELD_CONTENT_MAX_LEN: usize = 1024;

fn check_len(what: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() || value.chars().count() > max {
        return Err(Error::invalid(format!("A {} is 1 to {} characters long", what, max)));
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    check_len("response key", key, KEY_MAX_LEN)?;
    if key.chars().any(char::is_whitespace) {
        return Err(Error::invalid(format!("`{}`: a response key has no spaces", key)));
    }
    Ok(())
}

pub async fn create_canned<C: ConnectionTrait>(
    connector: &C,
    key: &str,
    title: &str,
    content: &str,
    fields: &[(String, String)],
) -> Result<model::canned_response::Model> {
    check_key(key)?;
    check_len("response title", title, TITLE_MAX_LEN)?;
    check_len("response content", content, CONTENT_MAX_LEN)?;
    let mut object = serde_json::Map::new();
    for (name, value) in fields {
        check_len("field name", name, FIELD_NAME_MAX_LEN)?;
        check_len("field content", value, FIELD_CONTENT_MAX_LEN)?;
        if object.insert(name.clone(), value.clone().into()).is_some() {
            return Err(Error::invalid(format!("Field `{}` is given twice", name)));
        }
    }
    if find_canned(connector, key).await?.is_some() {
        return Err(Error::Conflict(format!("Response `{}` already exists", key)));
    }
    let created = model::canned_response::ActiveModel {
        key: Set(key.to_string()),
        title: Set(title.to_string()),
        content: Set(content.to_string()),
        fields: Set(object.into()),
        ..Default::default()
    }
    .insert(connector)
    .await?;
    log_info!("Response {} (`{}`) created", created.id, created.key);
    Ok(created)
}

pub async fn find_canned<C: ConnectionTrait>(connector: &C, key: &str) -> Result<Option<model::canned_response::Model>> {
    Ok(model::CannedResponse::find()
        .filter(model::canned_response::Column::Key.eq(key))
        .one(connector)
        .await?)
}

pub async fn list_canned<C: ConnectionTrait>(connector: &C) -> Result<Vec<model::canned_response::Model>> {
    Ok(model::CannedResponse::find()
        .order_by_asc(model::canned_response::Column::Key)
        .all(connector)
        .await?)
}

pub async fn delete_canned<C: ConnectionTrait>(connector: &C, key: &str) -> Result<()> {
    let result = model::CannedResponse::delete_many()
        .filter(model::canned_response::Column::Key.eq(key))
        .exec(connector)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found(format!("Response `{}` not found", key)));
    }
    log_info!("Response `{}` removed", key);
    Ok(())
}
