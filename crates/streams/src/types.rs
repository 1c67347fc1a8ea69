//! Stream and subscriber model.

use std::{fmt, str::FromStr};

use serde::Serialize;

pub use tidings_channels::{ChannelId, UserId};

/// How a subscriber wants to be reached, as typed by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Private message to the subscriber.
    #[serde(rename = "dm")]
    Direct,
    /// Post in a channel, mentioning the subscriber.
    Channel,
}

impl DeliveryMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "dm",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a delivery mode string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown delivery mode: {0}")]
pub struct UnknownDeliveryMode(pub String);

impl FromStr for DeliveryMode {
    type Err = UnknownDeliveryMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dm" | "direct" => Ok(Self::Direct),
            "channel" => Ok(Self::Channel),
            other => Err(UnknownDeliveryMode(other.to_string())),
        }
    }
}

/// Resolved delivery target. A channel id exists exactly when the mode is
/// channel delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "delivery", rename_all = "lowercase")]
pub enum Delivery {
    #[serde(rename = "dm")]
    Direct,
    Channel { channel_id: ChannelId },
}

impl Delivery {
    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        match self {
            Self::Direct => DeliveryMode::Direct,
            Self::Channel { .. } => DeliveryMode::Channel,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            Self::Direct => None,
            Self::Channel { channel_id } => Some(*channel_id),
        }
    }
}

/// One user's registration on a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub user_id: UserId,
    #[serde(flatten)]
    pub delivery: Delivery,
}

impl Subscriber {
    #[must_use]
    pub fn direct(user_id: UserId) -> Self {
        Self {
            user_id,
            delivery: Delivery::Direct,
        }
    }

    #[must_use]
    pub fn channel(user_id: UserId, channel_id: ChannelId) -> Self {
        Self {
            user_id,
            delivery: Delivery::Channel { channel_id },
        }
    }
}

/// A named feed with its event source and subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    pub name: String,
    /// Registered source name, or path to an executable source. Relative
    /// paths resolve against the store's directory.
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<Subscriber>,
}

impl Stream {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            subscribers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Subscriber) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Case-insensitive name match, ignoring surrounding whitespace in `name`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    pub fn subscriber_mut(&mut self, user_id: UserId) -> Option<&mut Subscriber> {
        self.subscribers.iter_mut().find(|s| s.user_id == user_id)
    }
}

/// Find a stream by case-insensitive name.
pub fn find_stream_mut<'a>(streams: &'a mut [Stream], name: &str) -> Option<&'a mut Stream> {
    streams.iter_mut().find(|s| s.matches(name))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("dm", DeliveryMode::Direct)]
    #[case("DM", DeliveryMode::Direct)]
    #[case(" direct ", DeliveryMode::Direct)]
    #[case("channel", DeliveryMode::Channel)]
    #[case("Channel", DeliveryMode::Channel)]
    fn delivery_mode_parses(#[case] input: &str, #[case] expected: DeliveryMode) {
        assert_eq!(input.parse::<DeliveryMode>().unwrap(), expected);
    }

    #[test]
    fn delivery_mode_rejects_unknown() {
        let err = "email".parse::<DeliveryMode>().unwrap_err();
        assert_eq!(err, UnknownDeliveryMode("email".into()));
    }

    #[test]
    fn channel_id_only_for_channel_delivery() {
        assert_eq!(Subscriber::direct(1).delivery.channel_id(), None);
        assert_eq!(Subscriber::channel(1, 9).delivery.channel_id(), Some(9));
        assert_eq!(Subscriber::channel(1, 9).delivery.mode(), DeliveryMode::Channel);
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let mut streams = vec![Stream::new("Bowling", "bowling.sh")];
        assert!(find_stream_mut(&mut streams, "  bowling ").is_some());
        assert!(find_stream_mut(&mut streams, "birthdays").is_none());
    }

    #[test]
    fn subscriber_serializes_flat() {
        let json = serde_json::to_value(Subscriber::channel(5, 77)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_id": 5, "delivery": "channel", "channel_id": 77})
        );
        let json = serde_json::to_value(Subscriber::direct(5)).unwrap();
        assert_eq!(json, serde_json::json!({"user_id": 5, "delivery": "dm"}));
    }
}
