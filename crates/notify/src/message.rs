//! CI result types and Slack message composition.

use std::fmt;
use tracing::info;

/// Base URL for GitHub profile links.
const GITHUB_WEB_URL: &str = "https://github.com";

/// The commit a pipeline step ran against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub url: String,
    pub author_username: String,
    pub author_email: String,
    pub message: String,
}

impl Commit {
    /// First line of the commit message.
    #[must_use]
    pub fn title(&self) -> &str {
        commit_title(&self.message)
    }
}

/// Text before the first newline, or the whole message.
#[must_use]
pub fn commit_title(message: &str) -> &str {
    message.split('\n').next().unwrap_or_default()
}

/// Terminal outcome label of a CI status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    Success,
    Failure,
    Error,
    /// Any provider-specific label we do not interpret
    Other(String),
}

impl Conclusion {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// `failure` and `error` both count as failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self, Self::Failure | Self::Error)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a CI pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub name: String,
    pub description: String,
    pub conclusion: Conclusion,
    pub url: String,
}

/// How a commit author is shown in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorMention {
    /// Slack mention plus GitHub profile link
    SlackUser { user_id: String, username: String },
    /// GitHub profile link only
    ProfileLink { username: String },
}

impl AuthorMention {
    /// Mention `user_id` when known, otherwise link the GitHub profile.
    #[must_use]
    pub fn new(user_id: Option<String>, username: &str) -> Self {
        match user_id.filter(|id| !id.is_empty()) {
            Some(user_id) => Self::SlackUser {
                user_id,
                username: username.to_string(),
            },
            None => Self::ProfileLink {
                username: username.to_string(),
            },
        }
    }
}

impl fmt::Display for AuthorMention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlackUser { user_id, username } => write!(
                f,
                "<@{user_id}> (<{GITHUB_WEB_URL}/{username}|{username}>)"
            ),
            Self::ProfileLink { username } => write!(f, "<{GITHUB_WEB_URL}/{username}|{username}>"),
        }
    }
}

/// Channel broadcast for a failed pipeline step.
#[must_use]
pub fn compose_failure_notice(
    commit: &Commit,
    status: &CommitStatus,
    author: &AuthorMention,
) -> String {
    format!(
        ":warning: The commit <{}|\"_{}_\"> by {author} has failed the pipeline step <{}|{}>",
        commit.url,
        commit.title(),
        status.url,
        status.name,
    )
}

/// Direct message summarizing a pipeline step for its author.
#[must_use]
pub fn compose_status_summary(commit: &Commit, status: &CommitStatus) -> String {
    let (emoji, description) = match &status.conclusion {
        c if c.succeeded() => (":large_green_circle:", "was successful"),
        c if c.failed() => (":red_circle:", "failed"),
        other => {
            info!(conclusion = %other, "Got unknown commit status");
            (":question:", "has unknown status")
        }
    };

    format!(
        "{emoji} The CI job <{}|{}> for <{}|\"_{}_\"> {description}",
        status.url,
        status.name,
        commit.url,
        commit.title(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn commit(message: &str) -> Commit {
        Commit {
            url: "https://github.com/acme/api/commit/5494d59c335d1dabc1e7fb6739b2e4b2f1aa2eff"
                .to_string(),
            author_username: "jane".to_string(),
            author_email: "jane@acme.com".to_string(),
            message: message.to_string(),
        }
    }

    fn status(conclusion: &str) -> CommitStatus {
        CommitStatus {
            name: "build/test".to_string(),
            description: "Unit tests".to_string(),
            conclusion: Conclusion::parse(conclusion),
            url: "https://github.com/acme/api/actions/runs/123".to_string(),
        }
    }

    #[test]
    fn test_title_is_first_line() {
        assert_eq!(commit_title("Fix bug\n\nDetails..."), "Fix bug");
        assert_eq!(commit_title("one\ntwo\nthree"), "one");
        assert_eq!(commit_title("\nleading newline"), "");
        assert_eq!(commit_title("single line"), "single line");
        assert_eq!(commit_title(""), "");
    }

    #[test]
    fn test_conclusion_parsing() {
        assert!(Conclusion::parse("success").succeeded());
        assert!(Conclusion::parse("failure").failed());
        assert!(Conclusion::parse("error").failed());
        assert!(!Conclusion::parse("success").failed());

        let other = Conclusion::parse("cancelled");
        assert!(!other.succeeded() && !other.failed());
        assert_eq!(other.to_string(), "cancelled");
        assert_eq!(Conclusion::parse("Success"), Conclusion::Other("Success".to_string()));
    }

    #[test]
    fn test_summary_success() {
        let msg = compose_status_summary(&commit("Add feature\nbody"), &status("success"));
        assert_eq!(
            msg,
            ":large_green_circle: The CI job <https://github.com/acme/api/actions/runs/123|build/test> \
             for <https://github.com/acme/api/commit/5494d59c335d1dabc1e7fb6739b2e4b2f1aa2eff|\"_Add feature_\"> \
             was successful"
        );
    }

    #[test]
    fn test_summary_failure_kinds() {
        for conclusion in ["failure", "error"] {
            let msg = compose_status_summary(&commit("Fix"), &status(conclusion));
            assert!(msg.starts_with(":red_circle: "));
            assert!(msg.ends_with(" failed"));
        }
    }

    #[test]
    fn test_summary_unknown_conclusion() {
        for conclusion in ["cancelled", "skipped", "", "neutral"] {
            let msg = compose_status_summary(&commit("Fix"), &status(conclusion));
            assert!(msg.starts_with(":question: "));
            assert!(msg.ends_with(" has unknown status"));
        }
    }

    #[traced_test]
    #[test]
    fn test_unknown_conclusion_is_logged() {
        let _ = compose_status_summary(&commit("Fix"), &status("cancelled"));

        assert!(logs_contain("Got unknown commit status"));
        assert!(logs_contain("conclusion=cancelled"));
    }

    #[traced_test]
    #[test]
    fn test_known_conclusion_is_not_logged() {
        let _ = compose_status_summary(&commit("Fix"), &status("success"));

        assert!(!logs_contain("Got unknown commit status"));
    }

    #[test]
    fn test_failure_notice_contains_links() {
        let commit = commit("Fix bug\n\nDetails...");
        let status = status("failure");
        let author = AuthorMention::new(Some("U123".to_string()), "jane");

        let msg = compose_failure_notice(&commit, &status, &author);

        assert_eq!(
            msg,
            ":warning: The commit <https://github.com/acme/api/commit/5494d59c335d1dabc1e7fb6739b2e4b2f1aa2eff|\"_Fix bug_\"> \
             by <@U123> (<https://github.com/jane|jane>) has failed the pipeline step \
             <https://github.com/acme/api/actions/runs/123|build/test>"
        );
        assert!(!msg.contains("Details"));
    }

    #[test]
    fn test_mention_falls_back_to_profile_link() {
        assert_eq!(
            AuthorMention::new(None, "jane").to_string(),
            "<https://github.com/jane|jane>"
        );
        assert_eq!(
            AuthorMention::new(Some(String::new()), "jane").to_string(),
            "<https://github.com/jane|jane>"
        );
        assert_eq!(
            AuthorMention::new(Some("U42".to_string()), "jane").to_string(),
            "<@U42> (<https://github.com/jane|jane>)"
        );
    }
}
