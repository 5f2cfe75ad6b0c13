//! Run configuration.
//!
//! The CI platform hands action inputs over as environment variables.
//! [`ActionInputs`] captures them raw (each flag is backed by its variable)
//! and [`Config`] is the validated form every other component receives. No
//! component reads the environment after startup.

use clap::Args;
use scm::CommitRef;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::message::{Commit, CommitStatus, Conclusion};

/// Channel input value that means "no channel".
const NULL_SENTINEL: &str = "null";

/// Errors in the run configuration. Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required input is absent or blank
    #[error("input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// Input present but unusable
    #[error("invalid input {name}: {reason}")]
    InvalidInput { name: &'static str, reason: String },
}

/// Raw action inputs.
#[derive(Debug, Clone, Default, Args)]
pub struct ActionInputs {
    /// Slack bot token
    #[arg(long, env = "SLACK_ACCESS_TOKEN", hide_env_values = true)]
    pub slack_access_token: Option<String>,

    /// GitHub token able to read the organization SSO mapping
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub github_access_token: Option<String>,

    /// Web URL of the commit
    #[arg(long, env = "COMMIT_URL")]
    pub commit_url: Option<String>,

    /// GitHub login of the commit author (empty skips SSO resolution)
    #[arg(long, env = "COMMIT_AUTHOR_USERNAME")]
    pub commit_author_username: Option<String>,

    /// Email from the commit metadata
    #[arg(long, env = "COMMIT_AUTHOR_EMAIL")]
    pub commit_author_email: Option<String>,

    /// Full commit message
    #[arg(long, env = "COMMIT_MESSAGE")]
    pub commit_message: Option<String>,

    /// Name of the pipeline step
    #[arg(long, env = "STATUS_NAME")]
    pub status_name: Option<String>,

    /// Description of the pipeline step
    #[arg(long, env = "STATUS_DESCRIPTION")]
    pub status_description: Option<String>,

    /// Conclusion: success, failure, error, or anything else
    #[arg(long, env = "STATUS_CONCLUSION")]
    pub status_conclusion: Option<String>,

    /// Link to the job run
    #[arg(long, env = "STATUS_URL")]
    pub status_url: Option<String>,

    /// Channel to alert on failure ("null" or empty disables)
    #[arg(long, env = "SEND_MESSAGE_TO_CHANNEL")]
    pub send_message_to_channel: Option<String>,

    /// "true" to DM the commit author
    #[arg(long, env = "SEND_MESSAGE_TO_USER")]
    pub send_message_to_user: Option<String>,

    /// Organization holding the SSO mapping (defaults to the commit owner)
    #[arg(long, env = "GITHUB_ORG")]
    pub github_org: Option<String>,

    /// "true" to skip retrying SSO resolution with the pull request author
    #[arg(long, env = "DISABLE_PR_FALLBACK", num_args = 0..=1, default_missing_value = "true")]
    pub disable_pr_fallback: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = scm::github::DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = crate::channels::slack::DEFAULT_API_URL)]
    pub slack_api_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// File that receives `key=value` outputs (empty skips writing)
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<String>,

    /// "true" to compose and log messages without posting to Slack
    #[arg(long, env = "DRY_RUN", num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<String>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack_token: String,
    pub github_token: String,
    pub commit: Commit,
    pub status: CommitStatus,
    /// `None` disables the channel broadcast
    pub channel: Option<String>,
    pub send_direct_message: bool,
    pub github_org: Option<String>,
    /// `None` when the commit URL is not a GitHub commit link
    pub commit_ref: Option<CommitRef>,
    pub pr_fallback: bool,
    pub github_api_url: String,
    pub slack_api_url: String,
    pub request_timeout: Duration,
    pub output_file: Option<PathBuf>,
    pub dry_run: bool,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingInput(name))
}

/// Secrets pasted into CI settings often carry a trailing newline.
fn required_token(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    required(value, name).map(|v| v.trim().to_string())
}

/// Trim; empty and the `null` sentinel mean "not set".
fn channel_name(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NULL_SENTINEL)
}

fn flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v.eq_ignore_ascii_case("true") || v == "1"
    })
}

impl TryFrom<ActionInputs> for Config {
    type Error = ConfigError;

    fn try_from(inputs: ActionInputs) -> Result<Self, Self::Error> {
        // Tokens first so a misconfigured workflow fails on the obvious cause.
        let slack_token = required_token(inputs.slack_access_token, "slack_access_token")?;
        let github_token = required_token(inputs.github_access_token, "github_access_token")?;

        let commit = Commit {
            url: required(inputs.commit_url, "commit_url")?,
            author_username: inputs
                .commit_author_username
                .map(|u| u.trim().to_string())
                .unwrap_or_default(),
            author_email: required(inputs.commit_author_email, "commit_author_email")?,
            message: required(inputs.commit_message, "commit_message")?,
        };

        let status = CommitStatus {
            name: required(inputs.status_name, "status_name")?,
            description: required(inputs.status_description, "status_description")?,
            conclusion: Conclusion::parse(
                required(inputs.status_conclusion, "status_conclusion")?.trim(),
            ),
            url: required(inputs.status_url, "status_url")?,
        };

        if inputs.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidInput {
                name: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        let commit_ref = CommitRef::parse(&commit.url).ok();

        Ok(Self {
            slack_token,
            github_token,
            channel: channel_name(inputs.send_message_to_channel),
            send_direct_message: flag_enabled(inputs.send_message_to_user.as_deref()),
            github_org: inputs.github_org.filter(|o| !o.trim().is_empty()),
            commit_ref,
            pr_fallback: !flag_enabled(inputs.disable_pr_fallback.as_deref()),
            github_api_url: inputs.github_api_url,
            slack_api_url: inputs.slack_api_url,
            request_timeout: Duration::from_secs(inputs.request_timeout_secs),
            output_file: inputs
                .output_file
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            dry_run: flag_enabled(inputs.dry_run.as_deref()),
            commit,
            status,
        })
    }
}
