//! Live relay of ticket activity.
//!
//! Every ticket has a topic (`ticket|<id>`) carrying JSON frames: either an action
//! (`add`, `remove`, `rename`, `voice`, `close`) or a mirrored chat message. The web
//! panel subscribes to it to follow a ticket live.

mod pubsub;
mod redis;

use std::{collections::VecDeque, sync::Arc};

use futures::{stream::BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use serenity::async_trait;
use tokio::sync::{Mutex, Notify, OnceCell};

use crate::{db::RowID, error::Result, log_debug, log_info, log_warn};

pub use self::pubsub::MemoryPubSub;
pub use self::redis::RedisPubSub;

/// Transport of the relay frames.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
    /// Raw payloads published on `topic`. An item fails when a payload cannot be read.
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, Result<String>>>;
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TicketAction {
    Add {
        #[serde_as(as = "DisplayFromStr")]
        user: u64,
    },
    Remove {
        #[serde_as(as = "DisplayFromStr")]
        user: u64,
    },
    Rename {
        name: String,
    },
    Voice {
        #[serde_as(as = "DisplayFromStr")]
        channel: u64,
    },
    Close {
        #[serde_as(as = "DisplayFromStr")]
        by: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub avatar: String,
    pub message: String,
}

/// One JSON object on a ticket topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Action(TicketAction),
    Chat(ChatMessage),
}

impl Frame {
    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Action(TicketAction::Close { .. }))
    }
}

async fn publish_on(backend: &dyn PubSub, ticket_id: RowID, frame: &Frame) -> Result<()> {
    let payload = serde_json::to_string(frame)?;
    log_debug!("Relay {}: {}", topic(ticket_id), payload);
    backend.publish(&topic(ticket_id), payload).await
}

pub fn topic(ticket_id: RowID) -> String {
    format!("ticket|{}", ticket_id)
}

/// Ticket id carried by a channel name (`<anything>-<id>`).
pub fn ticket_id_from_channel_name(name: &str) -> Option<RowID> {
    let (_, id) = name.rsplit_once('-')?;
    id.parse().ok()
}

type Queue = std::sync::Mutex<VecDeque<(RowID, Frame)>>;

/// Handle on the relay, shared by every component.
///
/// The transport is attached once, possibly after components already started; publishing
/// waits for it instead of failing. Frames given to [`Relay::send`] go through a single
/// queue and reach the transport in the order they were sent.
#[derive(Clone, Default)]
pub struct Relay {
    backend: Arc<OnceCell<Arc<dyn PubSub>>>,
    ready: Arc<Notify>,
    queue: Arc<Queue>,
    flushing: Arc<Mutex<()>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_backend(backend: Arc<dyn PubSub>) -> Self {
        let relay = Self::new();
        relay.attach(backend);
        relay
    }
    /// Attach the transport and flush the frames queued until now. Later calls are ignored.
    pub fn attach(&self, backend: Arc<dyn PubSub>) {
        if self.backend.set(backend).is_ok() {
            log_info!("Relay ready");
            self.ready.notify_waiters();
            if !self.lock_queue().is_empty() {
                let relay = self.clone();
                tokio::spawn(async move { relay.flush().await });
            }
        }
    }
    pub fn is_ready(&self) -> bool {
        self.backend.initialized()
    }
    async fn backend(&self) -> Arc<dyn PubSub> {
        loop {
            let notified = self.ready.notified();
            if let Some(backend) = self.backend.get() {
                return Arc::clone(backend);
            }
            notified.await;
        }
    }
    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<(RowID, Frame)>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish one frame right away, bypassing the queue. Waits for the transport.
    pub async fn publish(&self, ticket_id: RowID, frame: &Frame) -> Result<()> {
        publish_on(self.backend().await.as_ref(), ticket_id, frame).await
    }

    /// Queue a frame and publish it, logging failures.
    ///
    /// Once the transport is attached the frame is published before this returns. Until
    /// then it waits in the queue and goes out, in order, when [`Relay::attach`] is called.
    pub async fn send(&self, ticket_id: RowID, frame: Frame) {
        // Queue first: attach flushes whatever was queued before it became ready.
        self.lock_queue().push_back((ticket_id, frame));
        if self.is_ready() {
            self.flush().await;
        }
    }

    /// Publish the queued frames, oldest first. One flush runs at a time.
    async fn flush(&self) {
        let backend = match self.backend.get() {
            Some(backend) => Arc::clone(backend),
            None => return,
        };
        let _flushing = self.flushing.lock().await;
        loop {
            let next = self.lock_queue().pop_front();
            let (ticket_id, frame) = match next {
                Some(next) => next,
                None => break,
            };
            if let Err(e) = publish_on(backend.as_ref(), ticket_id, &frame).await {
                log_warn!("Relay {}: publish failed: {}", topic(ticket_id), e);
            }
        }
    }

    /// Publish an action on the ticket named by the channel. Does nothing for other channels.
    pub async fn notify_action(&self, channel_name: &str, action: TicketAction) {
        match ticket_id_from_channel_name(channel_name) {
            Some(ticket_id) => self.send(ticket_id, Frame::Action(action)).await,
            None => log_debug!("Relay: {} is not a ticket channel", channel_name),
        }
    }

    /// Follow a ticket the way the web panel does.
    ///
    /// The stream ends after a `close` frame, on the first unreadable payload or when the
    /// transport closes.
    pub async fn subscribe(&self, ticket_id: RowID) -> Result<BoxStream<'static, Frame>> {
        let raw = self.backend().await.subscribe(&topic(ticket_id)).await?;
        let frames = futures::stream::unfold(Some(raw), move |state| async move {
            let mut raw = state?;
            let payload = match raw.next().await? {
                Ok(payload) => payload,
                Err(e) => {
                    log_warn!("Relay {}: {}", topic(ticket_id), e);
                    return None;
                }
            };
            match serde_json::from_str::<Frame>(&payload) {
                Ok(frame) => {
                    let next = if frame.is_close() { None } else { Some(raw) };
                    Some((frame, next))
                }
                Err(e) => {
                    log_warn!("Relay {}: undecodable frame: {}", topic(ticket_id), e);
                    None
                }
            }
        });
        Ok(frames.boxed())
    }
}
