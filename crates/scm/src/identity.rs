//! Commit author identity resolution.
//!
//! Resolution tries an ordered list of [`ResolutionStrategy`] values and stops
//! at the first one that yields an email. A miss is never fatal: when every
//! strategy fails the caller's original email is returned unchanged.

use tracing::{debug, info};

use crate::commit_ref::CommitRef;
use crate::error::ScmError;
use crate::github::GitHubApi;

/// A single way of turning a GitHub login into a verified email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Look up the committer's login in the organization SSO mapping.
    SsoByUsername,
    /// Find the pull request that carried the commit and look up its author.
    SsoByPullRequestAuthor,
}

impl ResolutionStrategy {
    /// Get the strategy name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SsoByUsername => "sso_by_username",
            Self::SsoByPullRequestAuthor => "sso_by_pull_request_author",
        }
    }
}

/// Where a resolved email came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// SSO mapping of the committer's login
    Sso { login: String },
    /// SSO mapping of the author of the pull request carrying the commit
    PullRequestAuthor { number: u64, login: String },
    /// Nothing resolved; the original email was kept
    Fallback,
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub email: String,
    pub source: ResolutionSource,
}

impl Resolution {
    fn fallback(email: &str) -> Self {
        Self {
            email: email.to_string(),
            source: ResolutionSource::Fallback,
        }
    }

    /// Whether a strategy produced the email.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.source != ResolutionSource::Fallback
    }
}

/// Resolves commit authors to SSO emails.
pub struct IdentityResolver<'a> {
    api: &'a dyn GitHubApi,
    org: Option<String>,
    commit: Option<CommitRef>,
    strategies: Vec<ResolutionStrategy>,
}

impl<'a> IdentityResolver<'a> {
    /// Create a resolver with both strategies enabled.
    ///
    /// `org` defaults to the commit's owner when `None`.
    #[must_use]
    pub fn new(api: &'a dyn GitHubApi, org: Option<String>, commit: Option<CommitRef>) -> Self {
        let org = org
            .filter(|o| !o.trim().is_empty())
            .or_else(|| commit.as_ref().map(|c| c.owner.clone()));

        Self {
            api,
            org,
            commit,
            strategies: vec![
                ResolutionStrategy::SsoByUsername,
                ResolutionStrategy::SsoByPullRequestAuthor,
            ],
        }
    }

    /// Replace the strategy chain.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<ResolutionStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Organization the SSO lookups run against.
    #[must_use]
    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    /// Resolve `username` to an email, keeping `fallback_email` on a miss.
    pub async fn resolve(&self, username: &str, fallback_email: &str) -> Resolution {
        let username = username.trim();
        if username.is_empty() {
            debug!("No author username, skipping identity resolution");
            return Resolution::fallback(fallback_email);
        }

        let Some(org) = self.org.as_deref() else {
            info!("No GitHub organization known, skipping identity resolution");
            return Resolution::fallback(fallback_email);
        };

        for strategy in &self.strategies {
            match self.attempt(*strategy, org, username).await {
                Ok(resolution) => {
                    info!(
                        strategy = strategy.as_str(),
                        email = %resolution.email,
                        "Resolved author email from GitHub SSO"
                    );
                    return resolution;
                }
                Err(e) => {
                    info!(
                        strategy = strategy.as_str(),
                        error = %e,
                        "Identity resolution strategy missed"
                    );
                }
            }
        }

        info!(
            email = fallback_email,
            "Keeping author email from commit metadata"
        );
        Resolution::fallback(fallback_email)
    }

    async fn attempt(
        &self,
        strategy: ResolutionStrategy,
        org: &str,
        username: &str,
    ) -> Result<Resolution, ScmError> {
        match strategy {
            ResolutionStrategy::SsoByUsername => {
                let email = self.api.sso_email(org, username).await?;
                Ok(Resolution {
                    email,
                    source: ResolutionSource::Sso {
                        login: username.to_string(),
                    },
                })
            }
            ResolutionStrategy::SsoByPullRequestAuthor => {
                let commit = self
                    .commit
                    .as_ref()
                    .ok_or_else(|| ScmError::InvalidCommitUrl("no commit reference".to_string()))?;

                let pulls = self.api.pull_requests_for_commit(commit).await?;
                let (number, login) = pulls
                    .into_iter()
                    .find_map(|pr| pr.author_login.map(|login| (pr.number, login)))
                    .ok_or_else(|| ScmError::NoPullRequest {
                        sha: commit.sha.clone(),
                    })?;

                if login.eq_ignore_ascii_case(username) {
                    return Err(ScmError::AlreadyTried { login });
                }

                debug!(pr = number, login = %login, "Retrying SSO lookup with pull request author");

                let email = self.api.sso_email(org, &login).await?;
                Ok(Resolution {
                    email,
                    source: ResolutionSource::PullRequestAuthor { number, login },
                })
            }
        }
    }
}
