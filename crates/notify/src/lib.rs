//! Slack notifications for CI pipeline step results.
//!
//! Given a commit and the status of one pipeline step, this crate resolves the
//! commit author's corporate identity, composes a Slack message and sends it
//! as a direct message to the author, as a channel alert when the step
//! failed, or both.
//!
//! # Usage
//!
//! ```no_run
//! use notify::config::{ActionInputs, Config};
//! use notify::pipeline::{connect, Pipeline};
//!
//! # async fn example(inputs: ActionInputs) -> Result<(), notify::pipeline::RunError> {
//! let config = Config::try_from(inputs)?;
//! let clients = connect(&config)?;
//! let report = Pipeline::new(&config, clients).run().await;
//! println!("resolved email: {}", report.author_email);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Inputs arrive as environment variables set by the workflow step (see
//! [`config::ActionInputs`]). The main ones:
//!
//! - `SLACK_ACCESS_TOKEN`, `GITHUB_ACCESS_TOKEN`: required tokens
//! - `SEND_MESSAGE_TO_CHANNEL`: channel alerted on failure (`null` disables)
//! - `SEND_MESSAGE_TO_USER`: `true` to DM the commit author
//! - `GITHUB_OUTPUT`: file receiving message identifiers
//!
//! # Architecture
//!
//! - [`ChatApi`] trait defines the chat platform boundary
//! - [`SlackClient`] implements it over the Slack Web API
//! - [`Dispatcher`] resolves recipients and sends composed messages
//! - [`pipeline::Pipeline`] runs resolve → compose → dispatch once

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod config;
pub mod error;
pub mod message;
pub mod outputs;
pub mod pipeline;

pub use channels::dry_run::DryRunChannel;
pub use channels::slack::SlackClient;
pub use channels::{ChatApi, PostedMessage};
pub use error::ChannelError;
pub use message::{AuthorMention, Commit, CommitStatus, Conclusion};

use std::sync::Arc;
use tracing::{debug, info};

/// Identifiers of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Channel ID for broadcasts, user ID for direct messages
    pub target_id: String,
    /// Provider-assigned message timestamp
    pub timestamp: String,
}

/// Sends composed messages through a chat platform.
pub struct Dispatcher {
    chat: Arc<dyn ChatApi>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatApi>) -> Self {
        Self { chat }
    }

    /// Name of the underlying platform.
    #[must_use]
    pub fn platform(&self) -> &'static str {
        self.chat.name()
    }

    /// Send `text` as a direct message to the user registered with `email`.
    ///
    /// # Errors
    ///
    /// Fails if the user lookup fails, finds nobody, or the post fails.
    pub async fn send_to_user(
        &self,
        email: &str,
        text: &str,
    ) -> Result<DispatchResult, ChannelError> {
        let user_id = self
            .chat
            .lookup_user_by_email(email)
            .await?
            .ok_or_else(|| ChannelError::UserNotFound(email.to_string()))?;

        debug!(platform = self.platform(), user = %user_id, text, "Sending direct message");

        let posted = self.chat.post_message(&user_id, text).await?;
        info!(user = %user_id, ts = %posted.ts, "Message sent to user");

        Ok(DispatchResult {
            target_id: user_id,
            timestamp: posted.ts,
        })
    }

    /// Send `text` to a channel by name or ID.
    ///
    /// # Errors
    ///
    /// Fails if the post fails.
    pub async fn send_to_channel(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<DispatchResult, ChannelError> {
        let posted = self.chat.post_message(channel, text).await?;
        info!(channel = %posted.channel, ts = %posted.ts, "Message sent to channel");

        Ok(DispatchResult {
            target_id: posted.channel,
            timestamp: posted.ts,
        })
    }

    /// Build the author mention, degrading to a GitHub link on any lookup miss.
    pub async fn author_mention(&self, email: &str, username: &str) -> AuthorMention {
        let user_id = match self.chat.lookup_user_by_email(email).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                info!(email, "No Slack user for email, defaulting to GitHub link");
                None
            }
            Err(e) => {
                info!(
                    error = %e,
                    "Got error getting Slack user by email, defaulting to GitHub link"
                );
                None
            }
        };

        AuthorMention::new(user_id, username)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory chat platform for tests.

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakeChat {
        pub users: HashMap<String, String>,
        pub lookup_fails: bool,
        pub post_fails: bool,
        pub lookups: AtomicUsize,
        pub posts: Mutex<Vec<(String, String)>>,
    }

    impl FakeChat {
        pub(crate) fn with_user(mut self, email: &str, id: &str) -> Self {
            self.users.insert(email.to_string(), id.to_string());
            self
        }

        pub(crate) fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        pub(crate) fn posted(&self) -> Vec<(String, String)> {
            self.posts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatApi for FakeChat {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, ChannelError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.lookup_fails {
                return Err(ChannelError::Api {
                    method: "users.lookupByEmail",
                    error: "invalid_auth".to_string(),
                });
            }
            Ok(self.users.get(email).cloned())
        }

        async fn post_message(
            &self,
            channel: &str,
            text: &str,
        ) -> Result<PostedMessage, ChannelError> {
            if self.post_fails {
                return Err(ChannelError::Api {
                    method: "chat.postMessage",
                    error: "channel_not_found".to_string(),
                });
            }
            let mut posts = self.posts.lock().unwrap();
            posts.push((channel.to_string(), text.to_string()));
            Ok(PostedMessage {
                channel: if channel.starts_with('U') {
                    format!("D{}", &channel[1..])
                } else {
                    format!("C-{}", channel.trim_start_matches('#'))
                },
                ts: format!("1718000000.{:06}", posts.len()),
            })
        }
    }
}
