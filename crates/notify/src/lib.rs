//! Client for the chat bot service that relays new-issue announcements.

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;

const SEND_MESSAGE_PATH: &str = "send-message";

/// Posts messages to the bot service's `send-message` endpoint.
#[derive(Clone)]
pub struct NotifyClient {
    http: Client,
    base_url: Url,
}

impl NotifyClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// Parses `base_url` and creates a client rooted there.
    pub fn from_base_url(base_url: &str, http: Client) -> Result<Self, NotifyError> {
        Ok(Self::new(Url::parse(base_url)?, http))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a single text message. Any non-2xx answer is an error.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = self.base_url.join(SEND_MESSAGE_PATH)?;
        let response = self
            .http
            .post(url)
            .json(&SendMessageRequest { text })
            .send()
            .await?;

        ensure_success(response).await
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    text: &'a str,
}

/// Errors produced by the notification client.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn ensure_success(response: Response) -> Result<(), NotifyError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(NotifyError::Status { status, body });
    }
    Ok(())
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base_url: &str) -> NotifyClient {
        NotifyClient::from_base_url(base_url, Client::builder().build().expect("client"))
            .expect("base url")
    }

    #[tokio::test]
    async fn send_message_posts_text_payload() {
        let server = MockServer::start_async().await;
        let client = client(&server.url("/bot"));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot/send-message")
                    .json_body(json!({ "text": "hello" }));
                then.status(200);
            })
            .await;

        client.send_message("hello").await.expect("send message");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn any_success_status_is_accepted() {
        let server = MockServer::start_async().await;
        let client = client(&server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/send-message");
                then.status(204);
            })
            .await;

        client.send_message("hello").await.expect("204 is success");
    }

    #[tokio::test]
    async fn error_status_returns_body() {
        let server = MockServer::start_async().await;
        let client = client(&server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/send-message");
                then.status(502).body("bot offline");
            })
            .await;

        let err = client.send_message("hello").await.expect_err("should error");
        match err {
            NotifyError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "bot offline");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let client = client("http://127.0.0.1:1/");
        let err = client.send_message("hello").await.expect_err("should error");
        assert!(matches!(err, NotifyError::Http(_)));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = client("http://bot.internal:8081/api");
        assert_eq!(client.base_url().as_str(), "http://bot.internal:8081/api/");
        assert!(NotifyClient::from_base_url("not a url", Client::new()).is_err());
    }
}
