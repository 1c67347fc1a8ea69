//! In-memory store for tests and embedding.

use std::{
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{Result, store::StreamStore, types::Stream};

/// Store backed by a `Vec`. No persistence.
#[derive(Default)]
pub struct InMemoryStore {
    streams: Mutex<Vec<Stream>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(streams: Vec<Stream>) -> Self {
        Self {
            streams: Mutex::new(streams),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<Stream>> {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        Ok(streams.clone())
    }

    async fn save(&self, streams: &[Stream]) -> Result<()> {
        let mut stored = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        *stored = streams.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_exists(&self) -> Result<()> {
        Ok(())
    }

    fn base_dir(&self) -> Option<&Path> {
        None
    }
}
