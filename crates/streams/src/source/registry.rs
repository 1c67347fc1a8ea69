//! In-process event sources addressed by name.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    event::Event,
    source::{EventSource, PluginError},
};

/// Named sources compiled into the host binary.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn EventSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own name, replacing any previous one.
    pub fn register(&mut self, source: impl EventSource + 'static) {
        let source: Arc<dyn EventSource> = Arc::new(source);
        self.sources.insert(source.name().to_string(), source);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EventSource>> {
        self.sources.get(name).cloned()
    }
}

type PollFn = dyn Fn() -> Result<Vec<Event>, PluginError> + Send + Sync;

/// Source backed by a synchronous closure.
pub struct FnSource {
    name: String,
    poll: Box<PollFn>,
}

impl FnSource {
    pub fn new<F>(name: impl Into<String>, poll: F) -> Self
    where
        F: Fn() -> Result<Vec<Event>, PluginError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            poll: Box::new(poll),
        }
    }
}

#[async_trait]
impl EventSource for FnSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_new_events(&self) -> Result<Vec<Event>, PluginError> {
        (self.poll)()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn register_replaces_same_name() {
        let mut registry = SourceRegistry::new();
        assert!(registry.get("b").is_none());
        registry.register(FnSource::new("b", || Ok(vec![])));
        registry.register(FnSource::new("a", || Ok(vec![])));
        registry.register(FnSource::new("b", || Ok(vec![Event::text("new")])));

        let b = registry.get("b").unwrap();
        assert_eq!(b.get_new_events().await.unwrap(), vec![Event::text("new")]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }

    #[tokio::test]
    async fn fn_source_polls_each_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = FnSource::new("counter", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Event::text(format!("call {n}"))])
        });

        assert_eq!(source.get_new_events().await.unwrap(), vec![Event::text("call 0")]);
        assert_eq!(source.get_new_events().await.unwrap(), vec![Event::text("call 1")]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
