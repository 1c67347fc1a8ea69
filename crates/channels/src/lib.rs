//! Delivery sinks.
//!
//! The dispatcher hands formatted notification text to a [`DeliverySink`],
//! which knows how to reach a user directly or post into a channel. Failures
//! are typed so callers can tell an unreachable recipient from a transport
//! problem.

pub mod console;
pub mod error;
pub mod sink;
pub mod webhook;

pub use {
    console::ConsoleSink,
    error::{Error, Result},
    sink::{ChannelId, DeliverySink, UserId},
    webhook::WebhookSink,
};
