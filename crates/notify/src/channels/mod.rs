//! Chat platform implementations.

pub mod dry_run;
pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;

/// A message accepted by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Channel the message landed in
    pub channel: String,
    /// Provider-assigned message timestamp
    pub ts: String,
}

/// Trait for chat platforms (Slack, dry-run logging).
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Get the name of this platform.
    fn name(&self) -> &'static str;

    /// Find the user ID registered with `email`.
    ///
    /// `Ok(None)` means the platform answered and has no such user.
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, ChannelError>;

    /// Post `text` to a channel name, channel ID or user ID.
    async fn post_message(&self, channel: &str, text: &str) -> Result<PostedMessage, ChannelError>;
}
