//! HTTP client for the Channel Talk native function endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::dto::{
    IssueTokenRequest, NativeFunction, NativeFunctionRequest, NativeFunctionResponse,
    RefreshTokenRequest, WriteGroupMessageRequest, WriteGroupMessageResponse,
};
use super::token::{AccessToken, TokenCache, TokenIssuer};
use crate::config::ChannelTalkConfig;

const NATIVE_FUNCTION_PATH: &str = "/general/v1/native/functions";

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Errors returned by the messaging API client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("error code: {status}. {body}")]
    Status { status: u16, body: String },

    /// The remote declared an error inside a 2xx response.
    #[error("client error: {kind}: {message}")]
    Api { kind: String, message: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed response: missing result")]
    MissingResult,
}

/// Outbound group messaging, as consumed by the notifier.
#[async_trait]
pub trait GroupMessenger: Send + Sync {
    async fn write_group_message(
        &self,
        request: &WriteGroupMessageRequest,
    ) -> Result<WriteGroupMessageResponse, ClientError>;
}

/// Channel Talk app store API client.
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    secret: SecretString,
    tokens: TokenCache,
}

impl Client {
    /// Create a client authenticating with the app `secret`.
    pub fn new(secret: SecretString, config: &ChannelTalkConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            secret,
            tokens: TokenCache::new(),
        })
    }

    /// Send a message to a group, returning the created message id.
    pub async fn write_group_message(
        &self,
        request: &WriteGroupMessageRequest,
    ) -> Result<WriteGroupMessageResponse, ClientError> {
        let token = self.tokens.access_token(&request.channel_id, self).await?;
        self.invoke(Some(&token), request).await
    }

    async fn invoke<F: NativeFunction>(
        &self,
        access_token: Option<&str>,
        params: &F,
    ) -> Result<F::Output, ClientError> {
        let body = NativeFunctionRequest {
            method: F::METHOD,
            params,
        };

        let mut request = self
            .http
            .put(format!("{}{}", self.endpoint, NATIVE_FUNCTION_PATH))
            .json(&body);
        if let Some(token) = access_token {
            request = request.header(ACCESS_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: NativeFunctionResponse = serde_json::from_str(&text)?;
        if let Some(error) = envelope.error {
            return Err(ClientError::Api {
                kind: error.kind,
                message: error.message,
            });
        }

        let result = envelope.result.ok_or(ClientError::MissingResult)?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl TokenIssuer for Client {
    async fn issue_token(&self, channel_id: &str) -> Result<AccessToken, ClientError> {
        let request = IssueTokenRequest {
            secret: self.secret.expose_secret(),
            channel_id,
        };
        let response = self.invoke(None, &request).await?;
        Ok(AccessToken::from_response(response, Utc::now()))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, ClientError> {
        let request = RefreshTokenRequest { refresh_token };
        let response = self.invoke(None, &request).await?;
        Ok(AccessToken::from_response(response, Utc::now()))
    }
}

#[async_trait]
impl GroupMessenger for Client {
    async fn write_group_message(
        &self,
        request: &WriteGroupMessageRequest,
    ) -> Result<WriteGroupMessageResponse, ClientError> {
        Client::write_group_message(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channeltalk::block::MessageBlock;
    use crate::channeltalk::dto::GroupMessage;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> Client {
        let config = ChannelTalkConfig {
            endpoint: server.url(),
            timeout_secs: 5,
        };
        Client::new(SecretString::new("s3cret".to_string()), &config).unwrap()
    }

    fn message_request() -> WriteGroupMessageRequest {
        WriteGroupMessageRequest {
            channel_id: "ch1".to_string(),
            group_id: "grp1".to_string(),
            root_message_id: None,
            broadcast: false,
            dto: GroupMessage {
                blocks: vec![MessageBlock::text("<b>hello</b>")],
                request_id: "req-1".to_string(),
                bot_name: "Feedy".to_string(),
                buttons: vec![],
            },
        }
    }

    async fn mock_issue(
        server: &mut mockito::ServerGuard,
        expires_in: i64,
        expect: usize,
    ) -> mockito::Mock {
        server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "method": "issueToken",
                "params": {"secret": "s3cret", "channelId": "ch1"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"result": {
                    "accessToken": "a1",
                    "refreshToken": "r1",
                    "expiresIn": expires_in
                }})
                .to_string(),
            )
            .expect(expect)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_write_group_message_issues_token_and_sends() {
        let mut server = mockito::Server::new_async().await;
        let issue = mock_issue(&mut server, 1800, 1).await;
        let write = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, "a1")
            .match_body(Matcher::PartialJson(json!({
                "method": "writeGroupMessage",
                "params": {
                    "channelId": "ch1",
                    "groupId": "grp1",
                    "dto": {"blocks": [{"type": "text", "value": "<b>hello</b>"}]}
                }
            })))
            .with_status(200)
            .with_body(json!({"result": {"message": {"id": "msg-1"}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client.write_group_message(&message_request()).await.unwrap();

        assert_eq!(response.message.id, "msg-1");
        issue.assert_async().await;
        write.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_reused_across_messages() {
        let mut server = mockito::Server::new_async().await;
        let issue = mock_issue(&mut server, 1800, 1).await;
        let write = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, "a1")
            .match_body(Matcher::PartialJson(json!({"method": "writeGroupMessage"})))
            .with_status(200)
            .with_body(json!({"result": {"message": {"id": "msg-1"}}}).to_string())
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        client.write_group_message(&message_request()).await.unwrap();
        client.write_group_message(&message_request()).await.unwrap();

        issue.assert_async().await;
        write.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_uses_refresh_exchange() {
        let mut server = mockito::Server::new_async().await;
        let issue = mock_issue(&mut server, 0, 1).await;
        let refresh = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "method": "issueToken",
                "params": {"refreshToken": "r1"}
            })))
            .with_status(200)
            .with_body(
                json!({"result": {
                    "accessToken": "a2",
                    "refreshToken": "r2",
                    "expiresIn": 1800
                }})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let first_write = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, "a1")
            .with_status(200)
            .with_body(json!({"result": {"message": {"id": "msg-1"}}}).to_string())
            .expect(1)
            .create_async()
            .await;
        let second_write = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, "a2")
            .with_status(200)
            .with_body(json!({"result": {"message": {"id": "msg-2"}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let first = client.write_group_message(&message_request()).await.unwrap();
        let second = client.write_group_message(&message_request()).await.unwrap();

        assert_eq!(first.message.id, "msg-1");
        assert_eq!(second.message.id, "msg-2");
        issue.assert_async().await;
        refresh.assert_async().await;
        first_write.assert_async().await;
        second_write.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _issue = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .write_group_message(&message_request())
            .await
            .unwrap_err();

        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "service unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embedded_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _issue = mock_issue(&mut server, 1800, 1).await;
        let _write = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .match_header(ACCESS_TOKEN_HEADER, "a1")
            .with_status(200)
            .with_body(
                json!({"error": {"type": "notFound", "message": "group not found"}}).to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .write_group_message(&message_request())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api { .. }));
        assert_eq!(err.to_string(), "client error: notFound: group not found");
    }

    #[tokio::test]
    async fn test_malformed_response_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _issue = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.issue_token("ch1").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_result_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _issue = server
            .mock("PUT", NATIVE_FUNCTION_PATH)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.issue_token("ch1").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingResult));
    }
}
