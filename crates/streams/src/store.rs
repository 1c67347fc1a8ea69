//! Persistence trait for stream definitions.

use std::path::Path;

use async_trait::async_trait;

use crate::{Result, types::Stream};

/// Durable home of every stream and its subscribers.
///
/// `load` returns a complete snapshot; `save` replaces the whole collection.
/// Callers that mutate must serialize their load → save cycles themselves
/// (see [`crate::subscriptions::SubscriptionManager`]).
#[async_trait]
pub trait StreamStore: Send + Sync {
    /// Load all streams in stored order. A missing store is created empty.
    async fn load(&self) -> Result<Vec<Stream>>;

    /// Replace the stored collection with `streams`.
    async fn save(&self, streams: &[Stream]) -> Result<()>;

    /// Create an empty store if none exists. Never overwrites.
    async fn ensure_exists(&self) -> Result<()>;

    /// Directory relative source references resolve against.
    fn base_dir(&self) -> Option<&Path>;
}
