//! Command trigger surface: what a chat command or CLI subcommand calls.
//!
//! Every command yields a short human-readable reply. Store failures are
//! reported in the reply instead of propagating, so a front end can always
//! answer the user.

use std::sync::Arc;

use {serde::Serialize, tidings_channels::DeliverySink, tracing::error};

use crate::{
    dispatch::{DispatchReport, Dispatcher},
    source::SourceLoader,
    store::StreamStore,
    subscriptions::{Outcome, SubscriptionManager},
    types::{ChannelId, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    pub ok: bool,
    pub message: String,
    /// Present for dispatch runs that completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DispatchReport>,
}

impl CommandReply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            report: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            report: None,
        }
    }

    fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Ok(message) => Self::ok(message),
            Err(rejection) => Self::failed(rejection.to_string()),
        }
    }
}

/// Owns the store, its subscription manager, and the dispatcher.
pub struct CommandService {
    store: Arc<dyn StreamStore>,
    subscriptions: SubscriptionManager,
    dispatcher: Dispatcher,
}

impl CommandService {
    pub fn new(
        store: Arc<dyn StreamStore>,
        loader: Arc<dyn SourceLoader>,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        Self {
            subscriptions: SubscriptionManager::new(Arc::clone(&store)),
            dispatcher: Dispatcher::new(loader, sink),
            store,
        }
    }

    pub async fn list_streams(&self) -> CommandReply {
        match self.subscriptions.list_stream_names().await {
            Ok(names) if names.is_empty() => CommandReply::ok("No notification streams are configured."),
            Ok(names) => {
                let names: Vec<String> = names.iter().map(|n| format!("`{n}`")).collect();
                CommandReply::ok(format!("Available streams: {}", names.join(", ")))
            },
            Err(e) => {
                error!(error = %e, "failed to list streams");
                CommandReply::failed(format!("Could not read notification streams: {e}"))
            },
        }
    }

    pub async fn subscribe(
        &self,
        stream_name: &str,
        user_id: UserId,
        delivery: &str,
        channel_id: Option<ChannelId>,
    ) -> CommandReply {
        match self
            .subscriptions
            .subscribe(stream_name, user_id, delivery, channel_id)
            .await
        {
            Ok(outcome) => CommandReply::from_outcome(outcome),
            Err(e) => {
                error!(stream = %stream_name, user_id, error = %e, "subscribe failed");
                CommandReply::failed(format!("Could not update subscriptions: {e}"))
            },
        }
    }

    pub async fn unsubscribe(&self, stream_name: &str, user_id: UserId) -> CommandReply {
        match self.subscriptions.unsubscribe(stream_name, user_id).await {
            Ok(outcome) => CommandReply::from_outcome(outcome),
            Err(e) => {
                error!(stream = %stream_name, user_id, error = %e, "unsubscribe failed");
                CommandReply::failed(format!("Could not update subscriptions: {e}"))
            },
        }
    }

    /// Dispatch a fresh snapshot of the store. Usable as the scheduler callback.
    pub async fn dispatch(&self) -> crate::Result<DispatchReport> {
        self.dispatcher.run(self.store.as_ref()).await
    }

    /// Manual one-shot run.
    pub async fn run_once(&self) -> CommandReply {
        match self.dispatch().await {
            Ok(report) => {
                let mut reply = CommandReply::ok(summarize(&report));
                reply.report = Some(report);
                reply
            },
            Err(e) => {
                error!(error = %e, "manual dispatch failed");
                CommandReply::failed(format!("Notification run failed: {e}"))
            },
        }
    }
}

fn summarize(report: &DispatchReport) -> String {
    if report.sent.is_empty() {
        return "Notification run complete. No streams were checked.".to_string();
    }
    let per_stream: Vec<String> = report
        .sent
        .iter()
        .map(|(name, count)| format!("{name}: {count}"))
        .collect();
    let mut summary = format!(
        "Notification run complete. Sent {} message(s) ({}).",
        report.total(),
        per_stream.join(", ")
    );
    if !report.diagnostics.is_empty() {
        summary.push_str(&format!(" {} problem(s) logged.", report.diagnostics.len()));
    }
    summary
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            event::Event,
            source::{DefaultLoader, FnSource, ProcessLoader, SourceRegistry},
            store_memory::InMemoryStore,
            types::{Stream, Subscriber},
        },
        tidings_channels::ConsoleSink,
    };

    fn service(streams: Vec<Stream>) -> CommandService {
        let mut registry = SourceRegistry::new();
        registry.register(FnSource::new("one", || Ok(vec![Event::text("hello")])));
        CommandService::new(
            Arc::new(InMemoryStore::new(streams)),
            Arc::new(DefaultLoader::new(registry, ProcessLoader::default())),
            Arc::new(ConsoleSink::new(Box::new(std::io::sink()))),
        )
    }

    #[tokio::test]
    async fn list_streams_reply() {
        assert_eq!(
            service(vec![]).list_streams().await.message,
            "No notification streams are configured."
        );
        let reply = service(vec![Stream::new("b", "x"), Stream::new("a", "y")])
            .list_streams()
            .await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Available streams: `a`, `b`");
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_replies() {
        let svc = service(vec![Stream::new("news", "one")]);

        let reply = svc.subscribe("news", 1, "channel", None).await;
        assert_eq!(reply, CommandReply::failed("Channel delivery requires a channel ID."));

        let reply = svc.subscribe("news", 1, "channel", Some(5)).await;
        assert!(reply.ok);
        assert_eq!(reply.message, "Subscribed to `news` via `channel`.");

        let reply = svc.unsubscribe("news", 2).await;
        assert!(!reply.ok);
        assert_eq!(reply.message, "You are not subscribed to `news`.");
    }

    #[tokio::test]
    async fn run_once_reports_counts() {
        let svc = service(vec![
            Stream::new("news", "one")
                .with_subscriber(Subscriber::direct(1))
                .with_subscriber(Subscriber::channel(2, 3)),
        ]);

        let reply = svc.run_once().await;
        assert!(reply.ok);
        assert_eq!(
            reply.message,
            "Notification run complete. Sent 2 message(s) (news: 2)."
        );
        assert_eq!(reply.report.unwrap().sent.get("news"), Some(&2));
    }
}
