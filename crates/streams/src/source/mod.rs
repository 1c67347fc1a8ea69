//! Event sources: the plugin boundary between the engine and polling code.
//!
//! A stream's `source` reference resolves to an [`EventSource`] through a
//! [`SourceLoader`]. Resolution and invocation failures are typed
//! [`PluginError`]s so the dispatcher can skip a stream without aborting the
//! run.

pub mod process;
pub mod registry;

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{event::Event, types::Stream};

pub use {
    process::{ProcessLoader, ProcessSource},
    registry::{FnSource, SourceRegistry},
};

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The reference names neither a registered source nor an existing file.
    #[error("event source not found: {reference}")]
    NotFound { reference: String },

    /// The reference exists but exposes no entry point the engine can call.
    #[error("event source {reference} has no entry point: {reason}")]
    MissingEntryPoint { reference: String, reason: String },

    /// Calling the entry point failed.
    #[error("event source {reference} failed: {reason}")]
    Invocation { reference: String, reason: String },

    #[error("event source {reference} timed out after {timeout:?}")]
    Timeout { reference: String, timeout: Duration },

    /// The entry point returned something that is not a sequence of events.
    #[error("event source {reference} returned invalid output: {reason}")]
    InvalidOutput { reference: String, reason: String },
}

impl PluginError {
    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    #[must_use]
    pub fn missing_entry_point(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingEntryPoint {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invocation(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invocation {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_output(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// A loaded event source. `get_new_events` takes no arguments and may return
/// different results on every call; reporting only new items is the source's
/// job, the engine never deduplicates.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get_new_events(&self) -> Result<Vec<Event>, PluginError>;
}

/// Resolves a stream's source reference into a callable [`EventSource`].
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// `base_dir` is where relative references resolve (the store's directory).
    async fn load(
        &self,
        stream: &Stream,
        base_dir: Option<&Path>,
    ) -> Result<Arc<dyn EventSource>, PluginError>;
}

/// Registry first, then executables on disk.
pub struct DefaultLoader {
    registry: SourceRegistry,
    process: ProcessLoader,
}

impl DefaultLoader {
    pub fn new(registry: SourceRegistry, process: ProcessLoader) -> Self {
        Self { registry, process }
    }
}

#[async_trait]
impl SourceLoader for DefaultLoader {
    async fn load(
        &self,
        stream: &Stream,
        base_dir: Option<&Path>,
    ) -> Result<Arc<dyn EventSource>, PluginError> {
        if let Some(source) = self.registry.get(stream.source.trim()) {
            return Ok(source);
        }
        self.process.load(stream, base_dir).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_wins_over_filesystem() {
        let mut registry = SourceRegistry::new();
        registry.register(FnSource::new("weather", || Ok(vec![Event::text("sunny")])));
        let loader = DefaultLoader::new(registry, ProcessLoader::default());

        let source = loader
            .load(&Stream::new("forecast", "weather"), None)
            .await
            .unwrap();
        assert_eq!(source.name(), "weather");
        assert_eq!(source.get_new_events().await.unwrap(), vec![Event::text("sunny")]);
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let loader = DefaultLoader::new(SourceRegistry::new(), ProcessLoader::default());

        let err = loader
            .load(&Stream::new("x", "nope.sh"), Some(tmp.path()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::NotFound { .. }));
    }
}
