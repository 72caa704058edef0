//! Request and response shapes of the Channel Talk function webhook.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function invocation sent by Channel Talk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionRequest {
    pub method: String,
    pub params: FunctionParams,
    pub context: FunctionContext,
}

impl FunctionRequest {
    /// Audit identity of the invoking user, `<type>:<id>`.
    pub fn actor(&self) -> String {
        format!("{}:{}", self.context.caller.kind, self.context.caller.id)
    }

    pub fn channel_id(&self) -> &str {
        &self.context.channel.id
    }

    /// The chat the command was typed in. For group chats this is the group id.
    pub fn group_id(&self) -> &str {
        &self.params.chat.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionParams {
    pub chat: Chat,
    pub trigger: Trigger,
    /// Method-specific arguments, decoded by the handler.
    pub input: Value,
    pub language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Chat {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionContext {
    pub channel: ChannelRef,
    pub caller: Caller,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Caller {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// Input of the `subscribe` method.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeInput {
    pub url: String,
    #[serde(default)]
    pub botname: String,
}

/// Input of the `unsubscribe` method.
#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeInput {
    pub id: FeedId,
}

/// Feed id as typed by the user or picked from an autocomplete choice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeedId {
    Number(i64),
    Text(String),
}

impl FeedId {
    pub fn parse(&self) -> Option<i64> {
        match self {
            FeedId::Number(id) => Some(*id),
            FeedId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedId::Number(id) => write!(f, "{id}"),
            FeedId::Text(s) => f.write_str(s),
        }
    }
}

/// Body returned to Channel Talk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResponse {
    pub result: FunctionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FunctionResult {
    Success { success: bool },
    Choices { choices: Vec<Choice> },
}

impl FunctionResponse {
    /// The acknowledgement sent for every handled or failed invocation.
    pub fn success() -> Self {
        Self {
            result: FunctionResult::Success { success: true },
        }
    }

    pub fn choices(choices: Vec<Choice>) -> Self {
        Self {
            result: FunctionResult::Choices { choices },
        }
    }
}

/// One autocomplete option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}
