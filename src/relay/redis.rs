use futures::{stream::BoxStream, StreamExt};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serenity::async_trait;

use super::PubSub;
use crate::{error::Result, log_info};

/// Relay transport over Redis pub/sub.
pub struct RedisPubSub {
    client: Client,
    publisher: ConnectionManager,
}

impl RedisPubSub {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        log_info!("Connected to the relay");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        let mut conn = self.publisher.clone();
        let _: i64 = conn.publish(topic, payload).await?;
        Ok(())
    }
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Result<String>>> {
        let mut pubsub = self.client.get_async_connection().await?.into_pubsub();
        pubsub.subscribe(topic).await?;
        let stream = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload::<String>().map_err(Into::into));
        Ok(stream.boxed())
    }
}
