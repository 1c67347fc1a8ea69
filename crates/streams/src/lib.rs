//! Notification streams: subscription storage, event sources, and dispatch.
//!
//! A stream is a named feed backed by an event source. Users subscribe to a
//! stream and pick how they want to be reached. A dispatch run polls every
//! stream's source once and fans each new event out to its subscribers.
//!
//! Stream definitions live in a hand-editable TOML file (see [`codec`]).
//! Every operation works on a freshly loaded snapshot of that file; edits go
//! through [`subscriptions::SubscriptionManager`], which serializes them.

pub mod codec;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod format;
pub mod source;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod subscriptions;
pub mod types;

pub use {
    commands::{CommandReply, CommandService},
    dispatch::{Diagnostic, DiagnosticKind, DispatchReport, Dispatcher},
    error::{Error, Result},
    event::Event,
    format::format_event,
    source::{
        DefaultLoader, EventSource, FnSource, PluginError, ProcessLoader, SourceLoader,
        SourceRegistry,
    },
    store::StreamStore,
    store_file::FileStore,
    store_memory::InMemoryStore,
    subscriptions::{Outcome, Rejection, SubscriptionManager},
    types::{Delivery, DeliveryMode, Stream, Subscriber},
};
