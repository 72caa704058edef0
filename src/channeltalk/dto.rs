//! Native function envelopes and payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::block::{Button, MessageBlock};

/// A remote procedure exposed by the native function endpoint.
pub trait NativeFunction: Serialize + Sync {
    /// Method name sent in the envelope.
    const METHOD: &'static str;
    /// Shape of the `result` field on success.
    type Output: DeserializeOwned;
}

#[derive(Debug, Serialize)]
pub(crate) struct NativeFunctionRequest<'a, P> {
    pub method: &'static str,
    pub params: &'a P,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NativeFunctionResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<NativeFunctionError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NativeFunctionError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Issue a credential from the app secret, scoped to a channel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest<'a> {
    pub secret: &'a str,
    pub channel_id: &'a str,
}

impl NativeFunction for IssueTokenRequest<'_> {
    const METHOD: &'static str = "issueToken";
    type Output = IssueTokenResponse;
}

/// Exchange a refresh token for a new credential.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

impl NativeFunction for RefreshTokenRequest<'_> {
    const METHOD: &'static str = "issueToken";
    type Output = IssueTokenResponse;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteGroupMessageRequest {
    pub channel_id: String,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_message_id: Option<String>,
    pub broadcast: bool,
    pub dto: GroupMessage,
}

impl NativeFunction for WriteGroupMessageRequest {
    const METHOD: &'static str = "writeGroupMessage";
    type Output = WriteGroupMessageResponse;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub blocks: Vec<MessageBlock>,
    pub request_id: String,
    pub bot_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteGroupMessageResponse {
    pub message: MessageRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}
