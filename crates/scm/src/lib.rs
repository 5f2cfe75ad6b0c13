//! Source-control lookups for commit authors.
//!
//! CI only hands us the committer's GitHub login and whatever email the commit
//! was authored with. That email is often a personal or `noreply` address, so
//! this crate asks GitHub for the verified corporate identity instead:
//!
//! - [`GitHubClient`] queries the organization's SAML identity mapping
//!   (GraphQL) and the pull requests associated with a commit (REST)
//! - [`CommitRef`] extracts `owner/repo@sha` from a commit URL
//! - [`IdentityResolver`] chains the lookups and falls back to the original
//!   email when every strategy misses
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use scm::{CommitRef, GitHubClient, IdentityResolver};
//!
//! # async fn example() -> Result<(), scm::ScmError> {
//! let github = GitHubClient::new(
//!     "ghp_token",
//!     scm::github::DEFAULT_API_URL,
//!     Duration::from_secs(30),
//! )?;
//! let commit = CommitRef::parse(
//!     "https://github.com/acme/api/commit/5494d59c335d1dabc1e7fb6739b2e4b2f1aa2eff",
//! )
//! .ok();
//!
//! let resolver = IdentityResolver::new(&github, Some("acme".to_string()), commit);
//! let resolution = resolver.resolve("octocat", "octocat@users.noreply.github.com").await;
//! println!("{}", resolution.email);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commit_ref;
pub mod error;
pub mod github;
pub mod identity;

pub use commit_ref::CommitRef;
pub use error::ScmError;
pub use github::{GitHubApi, GitHubClient, PullRequest};
pub use identity::{IdentityResolver, Resolution, ResolutionSource, ResolutionStrategy};
