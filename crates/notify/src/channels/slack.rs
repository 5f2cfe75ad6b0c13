//! Slack Web API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatApi, PostedMessage};
use crate::error::ChannelError;

/// Public Slack Web API base URL.
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Slack's error code for an unknown email.
const USERS_NOT_FOUND: &str = "users_not_found";

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl SlackClient {
    /// Create a Slack client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, api_url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("notify-slack-ci/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    /// Decode a Web API response.
    ///
    /// Slack reports most failures as HTTP 200 with `ok: false`; callers
    /// check the envelope.
    async fn read_response<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<SlackEnvelope<T>, ChannelError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                channel = "slack",
                method,
                status = %status,
                body = %body,
                "Slack API request failed"
            );
            return Err(ChannelError::Status {
                method,
                status,
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, ChannelError> {
        const METHOD: &str = "users.lookupByEmail";

        debug!(channel = "slack", email, "Looking up Slack user");

        let response = self
            .client
            .get(format!("{}/{METHOD}", self.api_url))
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await?;

        let envelope: SlackEnvelope<LookupByEmail> = Self::read_response(METHOD, response).await?;

        if !envelope.ok {
            let error = envelope.error.unwrap_or_else(|| "unknown error".to_string());
            if error == USERS_NOT_FOUND {
                return Ok(None);
            }
            return Err(ChannelError::Api {
                method: METHOD,
                error,
            });
        }

        Ok(envelope
            .body
            .user
            .and_then(|user| user.id)
            .filter(|id| !id.is_empty()))
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<PostedMessage, ChannelError> {
        const METHOD: &str = "chat.postMessage";

        let payload = PostMessage {
            channel,
            text,
            as_user: true,
            unfurl_links: false,
        };

        debug!(channel = "slack", target = channel, "Posting message");

        let response = self
            .client
            .post(format!("{}/{METHOD}", self.api_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let envelope: SlackEnvelope<PostMessageResponse> =
            Self::read_response(METHOD, response).await?;

        if !envelope.ok {
            return Err(ChannelError::Api {
                method: METHOD,
                error: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let channel = envelope.body.channel.ok_or(ChannelError::MissingField {
            method: METHOD,
            field: "channel",
        })?;
        let ts = envelope.body.ts.ok_or(ChannelError::MissingField {
            method: METHOD,
            field: "ts",
        })?;

        Ok(PostedMessage { channel, ts })
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct LookupByEmail {
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    as_user: bool,
    unfurl_links: bool,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SlackClient {
        SlackClient::new("xoxb-test", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_user_by_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.lookupByEmail"))
            .and(query_param("email", "jane@acme.com"))
            .and(header("authorization", "Bearer xoxb-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true, "user": { "id": "U123", "name": "jane" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .lookup_user_by_email("jane@acme.com")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("U123"));
    }

    #[tokio::test]
    async fn test_lookup_unknown_email_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.lookupByEmail"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "users_not_found" })),
            )
            .mount(&server)
            .await;

        let id = client(&server)
            .lookup_user_by_email("ghost@acme.com")
            .await
            .unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_lookup_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.lookupByEmail"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "missing_scope" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .lookup_user_by_email("jane@acme.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Api { error, .. } if error == "missing_scope"));
    }

    #[tokio::test]
    async fn test_post_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_json(json!({
                "channel": "ops-alerts",
                "text": "hello",
                "as_user": true,
                "unfurl_links": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channel": "C0943A91UMD",
                "ts": "1718000000.000100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let posted = client(&server)
            .post_message("ops-alerts", "hello")
            .await
            .unwrap();
        assert_eq!(posted.channel, "C0943A91UMD");
        assert_eq!(posted.ts, "1718000000.000100");
    }

    #[tokio::test]
    async fn test_post_message_channel_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message("nope", "hello")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "chat.postMessage failed: channel_not_found");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message("ops-alerts", "hello")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChannelError::RateLimited {
                retry_after_secs: 30
            }
        ));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.lookupByEmail"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server)
            .lookup_user_by_email("jane@acme.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Status { status, .. } if status.as_u16() == 503));
    }
}
