//! Chat platform stand-in that only logs.
//!
//! Used with `--dry-run` to exercise identity resolution and message
//! composition against real GitHub data without posting anything.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use super::{ChatApi, PostedMessage};
use crate::error::ChannelError;

/// User ID reported for every lookup.
pub const DRY_RUN_USER_ID: &str = "UDRYRUN";

/// Logs messages instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunChannel;

impl DryRunChannel {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Slack-style `seconds.micros` timestamp for now.
fn fake_ts() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

#[async_trait]
impl ChatApi for DryRunChannel {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, ChannelError> {
        info!(channel = "dry-run", email, "Skipping Slack user lookup");
        Ok(Some(DRY_RUN_USER_ID.to_string()))
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<PostedMessage, ChannelError> {
        info!(channel = "dry-run", target = channel, text, "Would post message");
        Ok(PostedMessage {
            channel: channel.to_string(),
            ts: fake_ts(),
        })
    }
}
