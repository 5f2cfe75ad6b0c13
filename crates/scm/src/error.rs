//! Error types for source-control lookups.

use thiserror::Error;

/// Errors that can occur when talking to GitHub.
///
/// Every variant is recoverable from the caller's point of view: identity
/// resolution treats all of them as a miss and moves on to the next strategy.
#[derive(Debug, Error)]
pub enum ScmError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status
    #[error("GitHub returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response body was not valid JSON for the expected type
    #[error("Malformed GitHub response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// GraphQL reported errors instead of data
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Response parsed but violated the expected structure
    #[error("Unexpected GitHub response shape: {0}")]
    Shape(String),

    /// SSO mapping has no identity for the login
    #[error("No external identity edges for {login} in {org}")]
    NoIdentity { org: String, login: String },

    /// No pull request is associated with the commit
    #[error("No pull requests associated with commit {sha}")]
    NoPullRequest { sha: String },

    /// A strategy would repeat a lookup that already missed
    #[error("Login {login} was already tried")]
    AlreadyTried { login: String },

    /// Commit URL does not point at a commit
    #[error("Invalid commit URL: {0}")]
    InvalidCommitUrl(String),
}
