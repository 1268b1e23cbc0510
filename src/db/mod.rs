pub mod controller;
pub mod model;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbConn, DbErr, Schema, TransactionTrait};

use crate::log_info;

/// Discord snowflakes, stored as signed 64 bits integers.
pub type IDType = i64;
/// Surrogate keys of the rows owned by the bot.
pub type RowID = i32;

pub async fn start_db(url: &str) -> Result<DbConn, DbErr> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    check_tables(&db).await?;
    log_info!("Database ready");
    Ok(db)
}

/// Create the missing tables from the entity definitions.
pub(crate) async fn check_tables(db: &DbConn) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let transaction = db.begin().await?;

    transaction.execute(builder.build(schema.create_table_from_entity(model::User).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Category).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Ticket).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Message).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Panel).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::Reaction).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(model::CannedResponse).if_not_exists())).await?;
    transaction.commit().await?;

    Ok(())
}
