//! One notification run: resolve identity, compose, dispatch.
//!
//! The run is strictly linear:
//!
//! ```text
//! LoadInputs -> ResolveIdentity -> MaybeSendDirect -> MaybeSendChannel -> Done
//! ```
//!
//! Only configuration and client construction errors abort a run. Resolution
//! misses fall back to the commit email, and a failed dispatch is logged
//! without stopping the other one.

use scm::{GitHubApi, GitHubClient, IdentityResolver, ResolutionSource, ResolutionStrategy};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::channels::dry_run::DryRunChannel;
use crate::channels::slack::SlackClient;
use crate::channels::ChatApi;
use crate::config::{ActionInputs, Config, ConfigError};
use crate::error::ChannelError;
use crate::message::{compose_failure_notice, compose_status_summary, Commit};
use crate::outputs::{CiOutputs, DispatchKind};
use crate::{DispatchResult, Dispatcher};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create GitHub client: {0}")]
    GitHub(#[from] scm::ScmError),

    #[error("failed to create Slack client: {0}")]
    Chat(#[from] ChannelError),
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct Clients {
    pub github: Arc<dyn GitHubApi>,
    pub chat: Arc<dyn ChatApi>,
}

/// Build the live GitHub and Slack clients for `config`.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be created.
pub fn connect(config: &Config) -> Result<Clients, RunError> {
    let github = GitHubClient::new(
        &config.github_token,
        &config.github_api_url,
        config.request_timeout,
    )?;

    let chat: Arc<dyn ChatApi> = if config.dry_run {
        info!("Dry run: messages will be logged, not sent");
        Arc::new(DryRunChannel::new())
    } else {
        Arc::new(SlackClient::new(
            &config.slack_token,
            &config.slack_api_url,
            config.request_timeout,
        )?)
    };

    Ok(Clients {
        github: Arc::new(github),
        chat,
    })
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Email used for the direct message and mention lookup
    pub author_email: String,
    pub email_source: ResolutionSource,
    /// Set when the direct message was delivered
    pub direct: Option<DispatchResult>,
    /// Set when the channel alert was delivered
    pub channel: Option<DispatchResult>,
}

/// Validate `inputs`, connect, and run.
///
/// `connect` is only called once the configuration is valid, so a bad
/// configuration never reaches the network.
///
/// # Errors
///
/// Returns an error on invalid configuration or if `connect` fails.
pub async fn execute<F>(inputs: ActionInputs, connect: F) -> Result<RunReport, RunError>
where
    F: FnOnce(&Config) -> Result<Clients, RunError>,
{
    let config = Config::try_from(inputs)?;
    let clients = connect(&config)?;
    Ok(Pipeline::new(&config, clients).run().await)
}

/// A single notification run.
pub struct Pipeline<'a> {
    config: &'a Config,
    github: Arc<dyn GitHubApi>,
    dispatcher: Dispatcher,
    outputs: CiOutputs,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a Config, clients: Clients) -> Self {
        Self {
            config,
            github: clients.github,
            dispatcher: Dispatcher::new(clients.chat),
            outputs: CiOutputs::new(config.output_file.clone()),
        }
    }

    /// Run every stage once.
    pub async fn run(&self) -> RunReport {
        info!(
            commit = %self.config.commit.url,
            status = %self.config.status.name,
            conclusion = %self.config.status.conclusion,
            "Running notify-slack-ci"
        );

        let mut commit = self.config.commit.clone();
        let resolution = self.resolve_identity(&commit).await;
        commit.author_email.clone_from(&resolution.email);

        let mut report = RunReport {
            author_email: resolution.email,
            email_source: resolution.source,
            direct: None,
            channel: None,
        };

        if self.config.send_direct_message {
            report.direct = self.send_direct(&commit).await;
        }

        if let Some(channel) = &self.config.channel {
            if self.config.status.conclusion.failed() {
                report.channel = self.send_channel(channel, &commit).await;
            } else {
                info!(
                    channel = %channel,
                    conclusion = %self.config.status.conclusion,
                    "Step did not fail, skipping channel message"
                );
            }
        }

        if self.config.send_direct_message && self.config.channel.is_some() {
            warn!(
                "Both direct and channel messages are enabled; their identifiers are \
                 written as direct_* and channel_* outputs, not slack_message_id/slack_channel_id"
            );
        }

        report
    }

    async fn resolve_identity(&self, commit: &Commit) -> scm::Resolution {
        let mut strategies = vec![ResolutionStrategy::SsoByUsername];
        if self.config.pr_fallback {
            strategies.push(ResolutionStrategy::SsoByPullRequestAuthor);
        }

        IdentityResolver::new(
            self.github.as_ref(),
            self.config.github_org.clone(),
            self.config.commit_ref.clone(),
        )
        .with_strategies(strategies)
        .resolve(&commit.author_username, &commit.author_email)
        .await
    }

    async fn send_direct(&self, commit: &Commit) -> Option<DispatchResult> {
        info!(email = %commit.author_email, "Sending message to user");
        let message = compose_status_summary(commit, &self.config.status);

        match self
            .dispatcher
            .send_to_user(&commit.author_email, &message)
            .await
        {
            Ok(result) => {
                self.outputs.record_dispatch(DispatchKind::Direct, &result);
                Some(result)
            }
            Err(e) => {
                error!(error = %e, "Failed to send message to user");
                None
            }
        }
    }

    async fn send_channel(&self, channel: &str, commit: &Commit) -> Option<DispatchResult> {
        info!(channel, "Sending message to channel");
        let author = self
            .dispatcher
            .author_mention(&commit.author_email, &commit.author_username)
            .await;
        let message = compose_failure_notice(commit, &self.config.status, &author);

        match self.dispatcher.send_to_channel(channel, &message).await {
            Ok(result) => {
                self.outputs.record_dispatch(DispatchKind::Channel, &result);
                Some(result)
            }
            Err(e) => {
                error!(error = %e, channel, "Failed to send message to channel");
                None
            }
        }
    }
}
