//! GitHub API client for author identity lookups.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::commit_ref::CommitRef;
use crate::error::ScmError;

/// Public GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const SSO_EMAIL_QUERY: &str = r"
query($org: String!, $login: String!) {
  organization(login: $org) {
    samlIdentityProvider {
      externalIdentities(first: 1, login: $login) {
        edges {
          node {
            samlIdentity {
              nameId
            }
          }
        }
      }
    }
  }
}
";

/// A pull request associated with a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_ref: String,
    pub base_ref: String,
    /// `None` when the author account was deleted.
    pub author_login: Option<String>,
}

/// GitHub operations needed to resolve a commit author.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Look up the SAML `nameId` mapped to `login` in `org`.
    async fn sso_email(&self, org: &str, login: &str) -> Result<String, ScmError>;

    /// List pull requests associated with a commit, most recent first.
    async fn pull_requests_for_commit(
        &self,
        commit: &CommitRef,
    ) -> Result<Vec<PullRequest>, ScmError>;
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, api_url: &str, timeout: Duration) -> Result<Self, ScmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("notify-slack-ci/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Read a response body, failing on non-success status codes.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ScmError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "GitHub API request failed");
            return Err(ScmError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn sso_email(&self, org: &str, login: &str) -> Result<String, ScmError> {
        let request = GraphQlRequest {
            query: SSO_EMAIL_QUERY,
            variables: SsoVariables { org, login },
        };

        debug!(org, login, "Querying SSO identity");

        let response = self
            .client
            .post(format!("{}/graphql", self.api_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let body: GraphQlResponse<SsoData> = Self::read_json(response).await?;
        extract_sso_email(body, org, login)
    }

    async fn pull_requests_for_commit(
        &self,
        commit: &CommitRef,
    ) -> Result<Vec<PullRequest>, ScmError> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}/pulls",
            self.api_url, commit.owner, commit.repo, commit.sha
        );

        debug!(commit = %commit, "Listing pull requests for commit");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let pulls: Vec<RawPullRequest> = Self::read_json(response).await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }
}

/// Validate an SSO query response and pull out the first identity's email.
fn extract_sso_email(
    body: GraphQlResponse<SsoData>,
    org: &str,
    login: &str,
) -> Result<String, ScmError> {
    if !body.errors.is_empty() {
        let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(ScmError::GraphQl(messages.join("; ")));
    }

    let organization = body
        .data
        .ok_or_else(|| ScmError::Shape("missing data".to_string()))?
        .organization
        .ok_or_else(|| ScmError::Shape(format!("organization {org} not found")))?;

    let provider = organization.saml_identity_provider.ok_or_else(|| {
        ScmError::Shape(format!("organization {org} has no SAML identity provider"))
    })?;

    let Some(edge) = provider.external_identities.edges.into_iter().next() else {
        return Err(ScmError::NoIdentity {
            org: org.to_string(),
            login: login.to_string(),
        });
    };

    edge.node
        .and_then(|node| node.saml_identity)
        .and_then(|identity| identity.name_id)
        .map(|name_id| name_id.trim().to_string())
        .filter(|name_id| !name_id.is_empty())
        .ok_or_else(|| ScmError::Shape("identity edge without samlIdentity.nameId".to_string()))
}

// =============================================================================
// GitHub API types
// =============================================================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: SsoVariables<'a>,
}

#[derive(Debug, Serialize)]
struct SsoVariables<'a> {
    org: &'a str,
    login: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SsoData {
    organization: Option<Organization>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organization {
    saml_identity_provider: Option<SamlIdentityProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamlIdentityProvider {
    external_identities: ExternalIdentities,
}

#[derive(Debug, Deserialize)]
struct ExternalIdentities {
    #[serde(default)]
    edges: Vec<IdentityEdge>,
}

#[derive(Debug, Deserialize)]
struct IdentityEdge {
    node: Option<IdentityNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityNode {
    saml_identity: Option<SamlIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamlIdentity {
    name_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    html_url: String,
    head: RawBranch,
    base: RawBranch,
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            url: raw.html_url,
            head_ref: raw.head.name,
            base_ref: raw.base.name,
            author_login: raw.user.map(|u| u.login),
        }
    }
}
