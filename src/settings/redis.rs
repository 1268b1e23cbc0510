use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serenity::async_trait;

use super::CacheBackend;
use crate::{error::Result, log_info};

/// Settings cache stored in Redis.
///
/// Scalars are plain string keys, lists are Redis sets.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        log_info!("Connected to the settings cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }
    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }
    async fn members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.smembers(key).await?)
    }
    async fn add_member(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.sadd(key, value).await?;
        Ok(())
    }
    async fn remove_member(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.srem(key, value).await?;
        Ok(removed > 0)
    }
}
