use std::{collections::HashMap, sync::Mutex};

use futures::{stream::BoxStream, StreamExt};
use serenity::async_trait;
use tokio::sync::broadcast;

use super::PubSub;
use crate::error::Result;

const CAPACITY: usize = 256;

/// In-process hub: one broadcast channel per topic.
#[derive(Default)]
pub struct MemoryPubSub {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
    history: Mutex<Vec<(String, String)>>,
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }
    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CAPACITY).0)
            .clone()
    }
    /// Every payload published on `topic` so far.
    pub fn published(&self, topic: &str) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((topic.to_string(), payload.clone()));
        // Nobody listening is not an error.
        let _ = self.sender(topic).send(payload);
        Ok(())
    }
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Result<String>>> {
        let receiver = self.sender(topic).subscribe();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(payload) => return Some((Ok(payload), receiver)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
