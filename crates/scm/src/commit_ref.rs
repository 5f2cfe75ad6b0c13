//! Commit URL parsing.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::ScmError;

/// `https://<host>/<owner>/<repo>/commit/<40 hex sha>` with optional trailing
/// path, query or fragment.
static COMMIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/([^/]+)/([^/]+)/commit/([0-9a-fA-F]{40})(?:[/?#].*)?$").unwrap()
});

/// A commit identified by repository and SHA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub owner: String,
    pub repo: String,
    pub sha: String,
}

impl CommitRef {
    /// Parse a commit web URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::InvalidCommitUrl`] if the URL has no `/commit/`
    /// segment followed by a full 40-character SHA.
    pub fn parse(url: &str) -> Result<Self, ScmError> {
        let caps = COMMIT_URL
            .captures(url.trim())
            .ok_or_else(|| ScmError::InvalidCommitUrl(url.to_string()))?;

        Ok(Self {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
            sha: caps[3].to_ascii_lowercase(),
        })
    }

    /// `owner/repo` slug.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.sha)
    }
}
