//! Subscribe and unsubscribe edits against the stream store.
//!
//! Every edit is a load → mutate → save cycle under one process-wide lock, so
//! concurrent edits never lose each other's changes, even when they come
//! through different managers. A second process editing the same store is not
//! coordinated with.

use std::sync::Arc;

use {
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    Result,
    store::StreamStore,
    types::{ChannelId, Delivery, DeliveryMode, Subscriber, UserId, find_stream_mut},
};

/// An edit refused before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Delivery must be `dm` or `channel`.")]
    InvalidDelivery { given: String },

    #[error("Channel delivery requires a channel ID.")]
    MissingChannelId,

    #[error("Unknown stream `{name}`.")]
    UnknownStream { name: String },

    #[error("You are not subscribed to `{stream}`.")]
    NotSubscribed { stream: String },
}

/// Confirmation message on success, rejection otherwise. Store failures are
/// the outer `Result`.
pub type Outcome = std::result::Result<String, Rejection>;

/// Single writer for every store edit in this process.
static WRITE_LOCK: Mutex<()> = Mutex::const_new(());

/// Edits a [`StreamStore`] under the process-wide write lock.
pub struct SubscriptionManager {
    store: Arc<dyn StreamStore>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn StreamStore>) -> Self {
        Self { store }
    }

    /// Subscribe `user_id` to a stream, or update their delivery if already
    /// subscribed. `delivery` is `dm`/`direct` or `channel`.
    pub async fn subscribe(
        &self,
        stream_name: &str,
        user_id: UserId,
        delivery: &str,
        channel_id: Option<ChannelId>,
    ) -> Result<Outcome> {
        let delivery = match resolve_delivery(delivery, channel_id) {
            Ok(d) => d,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let _guard = WRITE_LOCK.lock().await;
        let mut streams = self.store.load().await?;
        let Some(stream) = find_stream_mut(&mut streams, stream_name) else {
            return Ok(Err(Rejection::UnknownStream {
                name: stream_name.trim().to_string(),
            }));
        };

        let message = format!("Subscribed to `{}` via `{}`.", stream.name, delivery.mode());
        match stream.subscriber_mut(user_id) {
            Some(existing) => {
                existing.delivery = delivery;
                debug!(stream = %stream_name.trim(), user_id, "updated existing subscriber");
            },
            None => stream.subscribers.push(Subscriber { user_id, delivery }),
        }

        self.store.save(&streams).await?;
        info!(stream = %stream_name.trim(), user_id, mode = %delivery.mode(), "subscribed");
        Ok(Ok(message))
    }

    /// Remove `user_id` from a stream.
    pub async fn unsubscribe(&self, stream_name: &str, user_id: UserId) -> Result<Outcome> {
        let _guard = WRITE_LOCK.lock().await;
        let mut streams = self.store.load().await?;
        let Some(stream) = find_stream_mut(&mut streams, stream_name) else {
            return Ok(Err(Rejection::UnknownStream {
                name: stream_name.trim().to_string(),
            }));
        };

        let before = stream.subscribers.len();
        stream.subscribers.retain(|s| s.user_id != user_id);
        if stream.subscribers.len() == before {
            return Ok(Err(Rejection::NotSubscribed {
                stream: stream.name.clone(),
            }));
        }
        let message = format!("Unsubscribed from `{}`.", stream.name);

        self.store.save(&streams).await?;
        info!(stream = %stream_name.trim(), user_id, "unsubscribed");
        Ok(Ok(message))
    }

    /// All stream names, sorted.
    pub async fn list_stream_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .load()
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        Ok(names)
    }
}

fn resolve_delivery(
    delivery: &str,
    channel_id: Option<ChannelId>,
) -> std::result::Result<Delivery, Rejection> {
    let mode = delivery
        .parse::<DeliveryMode>()
        .map_err(|e| Rejection::InvalidDelivery { given: e.0 })?;
    match (mode, channel_id) {
        (DeliveryMode::Direct, _) => Ok(Delivery::Direct),
        (DeliveryMode::Channel, Some(channel_id)) => Ok(Delivery::Channel { channel_id }),
        (DeliveryMode::Channel, None) => Err(Rejection::MissingChannelId),
    }
}
