use std::error::Error as StdError;

/// Crate-wide result type for delivery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed delivery errors shared by every sink.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The recipient cannot be reached (unknown user, direct messages
    /// disabled, deleted channel).
    #[error("recipient unreachable: {target}: {reason}")]
    Unreachable { target: String, reason: String },

    /// The channel exists but does not accept messages.
    #[error("channel {channel_id} is not messageable")]
    NotMessageable { channel_id: i64 },

    /// Input payload or parameter is invalid.
    #[error("invalid delivery input: {message}")]
    InvalidInput { message: String },

    /// Sink is not configured or not ready.
    #[error("delivery unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("delivery failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn unreachable(target: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn not_messageable(channel_id: i64) -> Self {
        Self::NotMessageable { channel_id }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the failure is about the recipient rather than the transport.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::NotMessageable { .. })
    }
}
