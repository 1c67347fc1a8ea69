use async_trait::async_trait;

use crate::Result;

/// Platform user identifier.
pub type UserId = i64;

/// Platform channel identifier.
pub type ChannelId = i64;

/// Send notification text to users and channels.
///
/// Implementations resolve the destination themselves (open a direct-message
/// conversation, look up or fetch a channel) and must report a destination
/// that cannot receive messages as [`crate::Error::Unreachable`] or
/// [`crate::Error::NotMessageable`].
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver `text` privately to `user_id`.
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()>;

    /// Post `text` into `channel_id`.
    async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()>;

    /// Inline mention of a user, used to prefix channel posts.
    fn mention(&self, user_id: UserId) -> String {
        format!("<@{user_id}>")
    }
}
