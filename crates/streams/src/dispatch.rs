//! Poll every stream's source once and fan new events out to subscribers.
//!
//! Source failures skip their stream; delivery failures skip one subscriber
//! for one message. Neither ever aborts the run: `dispatch_all` always returns
//! a report, possibly partial.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    serde::Serialize,
    tidings_channels::DeliverySink,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    event::Event,
    format::format_event,
    source::SourceLoader,
    store::StreamStore,
    types::{Delivery, Stream, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// The stream's source could not be loaded or invoked.
    Plugin,
    /// One message could not be delivered to one subscriber.
    Delivery,
}

impl DiagnosticKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Delivery => "delivery",
        }
    }
}

/// A failure contained during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stream: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Successful deliveries per stream. Streams whose source failed are absent.
    pub sent: BTreeMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DispatchReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.sent.values().sum()
    }

    fn plugin_failure(&mut self, stream: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            stream: stream.to_string(),
            user_id: None,
            kind: DiagnosticKind::Plugin,
            message,
        });
    }
}

pub struct Dispatcher {
    loader: Arc<dyn SourceLoader>,
    sink: Arc<dyn DeliverySink>,
}

impl Dispatcher {
    pub fn new(loader: Arc<dyn SourceLoader>, sink: Arc<dyn DeliverySink>) -> Self {
        Self { loader, sink }
    }

    /// Load one snapshot of `store` and dispatch it.
    pub async fn run(&self, store: &dyn StreamStore) -> Result<DispatchReport> {
        let streams = store.load().await?;
        Ok(self.dispatch_all(&streams, store.base_dir()).await)
    }

    /// Dispatch `streams` in order.
    pub async fn dispatch_all(&self, streams: &[Stream], base_dir: Option<&Path>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for stream in streams {
            let events = match self.poll(stream, base_dir).await {
                Ok(events) => events,
                Err(message) => {
                    warn!(stream = %stream.name, error = %message, "skipping stream");
                    report.plugin_failure(&stream.name, message);
                    continue;
                },
            };

            let mut sent = 0;
            for event in &events {
                let text = format_event(&stream.name, event);
                for subscriber in &stream.subscribers {
                    match self.deliver(subscriber.user_id, subscriber.delivery, &text).await {
                        Ok(()) => sent += 1,
                        Err(e) => {
                            warn!(
                                stream = %stream.name,
                                user_id = subscriber.user_id,
                                error = %e,
                                "delivery failed"
                            );
                            report.diagnostics.push(Diagnostic {
                                stream: stream.name.clone(),
                                user_id: Some(subscriber.user_id),
                                kind: DiagnosticKind::Delivery,
                                message: e.to_string(),
                            });
                        },
                    }
                }
            }

            debug!(stream = %stream.name, events = events.len(), sent, "stream dispatched");
            *report.sent.entry(stream.name.clone()).or_default() += sent;
        }

        info!(
            streams = report.sent.len(),
            sent = report.total(),
            diagnostics = report.diagnostics.len(),
            "dispatch run complete"
        );
        report
    }

    /// Load and invoke the stream's source on its own task so a panicking
    /// source is contained like any other failure.
    async fn poll(
        &self,
        stream: &Stream,
        base_dir: Option<&Path>,
    ) -> std::result::Result<Vec<Event>, String> {
        let loader = Arc::clone(&self.loader);
        let owned = stream.clone();
        let base_dir: Option<PathBuf> = base_dir.map(Path::to_path_buf);

        let task = tokio::spawn(async move {
            let source = loader.load(&owned, base_dir.as_deref()).await?;
            source.get_new_events().await
        });

        match task.await {
            Ok(Ok(events)) => Ok(events),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join) if join.is_panic() => Err(format!("event source for {} panicked", stream.name)),
            Err(join) => Err(join.to_string()),
        }
    }

    async fn deliver(
        &self,
        user_id: UserId,
        delivery: Delivery,
        text: &str,
    ) -> tidings_channels::Result<()> {
        match delivery {
            Delivery::Direct => self.sink.send_direct(user_id, text).await,
            Delivery::Channel { channel_id } => {
                let text = format!("{} {text}", self.sink.mention(user_id));
                self.sink.send_to_channel(channel_id, &text).await
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            source::{
                DefaultLoader, EventSource, FnSource, PluginError, ProcessLoader, SourceRegistry,
            },
            store_memory::InMemoryStore,
            types::Subscriber,
        },
        async_trait::async_trait,
        std::sync::Mutex,
        tidings_channels::{ChannelId, Error as SinkError},
    };

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, i64, String)>>,
        unreachable_users: Vec<UserId>,
    }

    impl RecordingSink {
        fn failing_for(users: Vec<UserId>) -> Self {
            Self {
                unreachable_users: users,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(String, i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn send_direct(&self, user_id: UserId, text: &str) -> tidings_channels::Result<()> {
            if self.unreachable_users.contains(&user_id) {
                return Err(SinkError::unreachable(format!("user {user_id}"), "dms disabled"));
            }
            self.sent
                .lock()
                .unwrap()
                .push(("dm".into(), user_id, text.into()));
            Ok(())
        }

        async fn send_to_channel(
            &self,
            channel_id: ChannelId,
            text: &str,
        ) -> tidings_channels::Result<()> {
            if channel_id < 0 {
                return Err(SinkError::not_messageable(channel_id));
            }
            self.sent
                .lock()
                .unwrap()
                .push(("channel".into(), channel_id, text.into()));
            Ok(())
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl EventSource for PanickingSource {
        fn name(&self) -> &str {
            "panics"
        }

        async fn get_new_events(&self) -> std::result::Result<Vec<Event>, PluginError> {
            panic!("source exploded");
        }
    }

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register(FnSource::new("two-events", || {
            Ok(vec![Event::text("first"), Event::text("second")])
        }));
        registry.register(FnSource::new("quiet", || Ok(vec![])));
        registry.register(FnSource::new("broken", || {
            Err(PluginError::invocation("broken", "feed offline"))
        }));
        registry.register(PanickingSource);
        registry
    }

    fn dispatcher(sink: Arc<RecordingSink>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(DefaultLoader::new(registry(), ProcessLoader::default())),
            sink,
        )
    }

    #[tokio::test]
    async fn counts_every_successful_delivery() {
        let sink = Arc::new(RecordingSink::default());
        let streams = vec![
            Stream::new("news", "two-events")
                .with_subscriber(Subscriber::direct(1))
                .with_subscriber(Subscriber::channel(2, 50)),
        ];

        let report = dispatcher(sink.clone()).dispatch_all(&streams, None).await;
        assert_eq!(report.sent.get("news"), Some(&4));
        assert!(report.diagnostics.is_empty());
        assert_eq!(sink.sent(), vec![
            ("dm".into(), 1, "[news] first".into()),
            ("channel".into(), 50, "<@2> [news] first".into()),
            ("dm".into(), 1, "[news] second".into()),
            ("channel".into(), 50, "<@2> [news] second".into()),
        ]);
    }

    #[tokio::test]
    async fn empty_source_records_zero() {
        let sink = Arc::new(RecordingSink::default());
        let streams = vec![Stream::new("calm", "quiet").with_subscriber(Subscriber::direct(1))];

        let report = dispatcher(sink).dispatch_all(&streams, None).await;
        assert_eq!(report.sent.get("calm"), Some(&0));
    }

    #[tokio::test]
    async fn failing_and_panicking_sources_are_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let streams = vec![
            Stream::new("broken", "broken").with_subscriber(Subscriber::direct(1)),
            Stream::new("boom", "panics").with_subscriber(Subscriber::direct(1)),
            Stream::new("missing", "does-not-exist.sh").with_subscriber(Subscriber::direct(1)),
            Stream::new("news", "two-events").with_subscriber(Subscriber::direct(1)),
        ];

        let report = dispatcher(sink).dispatch_all(&streams, None).await;
        assert_eq!(report.sent.len(), 1);
        assert_eq!(report.sent.get("news"), Some(&2));

        let failed: Vec<_> = report
            .diagnostics
            .iter()
            .map(|d| (d.stream.as_str(), d.kind))
            .collect();
        assert_eq!(failed, vec![
            ("broken", DiagnosticKind::Plugin),
            ("boom", DiagnosticKind::Plugin),
            ("missing", DiagnosticKind::Plugin),
        ]);
        assert!(report.diagnostics[1].message.contains("panicked"));
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_other_subscribers() {
        let sink = Arc::new(RecordingSink::failing_for(vec![1]));
        let streams = vec![
            Stream::new("news", "two-events")
                .with_subscriber(Subscriber::direct(1))
                .with_subscriber(Subscriber::channel(3, -5))
                .with_subscriber(Subscriber::direct(2)),
        ];

        let report = dispatcher(sink.clone()).dispatch_all(&streams, None).await;
        assert_eq!(report.sent.get("news"), Some(&2));
        assert_eq!(report.diagnostics.len(), 4);
        assert!(
            report
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::Delivery && d.user_id.is_some())
        );
        assert!(sink.sent().iter().all(|(_, id, _)| *id == 2));
    }

    #[tokio::test]
    async fn run_uses_store_snapshot() {
        let store = InMemoryStore::new(vec![
            Stream::new("news", "two-events").with_subscriber(Subscriber::direct(1)),
        ]);
        let sink = Arc::new(RecordingSink::default());

        let report = dispatcher(sink).run(&store).await.unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn report_serializes_for_json_output() {
        let mut report = DispatchReport::default();
        report.sent.insert("news".into(), 3);
        report.plugin_failure("broken", "boom".into());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sent": {"news": 3},
                "diagnostics": [{"stream": "broken", "kind": "plugin", "message": "boom"}]
            })
        );
    }
}
