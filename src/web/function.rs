//! Channel Talk function webhook handler.
//!
//! Channel Talk cannot show error responses to the user who ran a command,
//! so every invocation is acknowledged with `{"result":{"success":true}}`.
//! Expected errors are posted back to the group as a message instead.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::dto::{Choice, FunctionRequest, FunctionResponse, SubscribeInput, UnsubscribeInput};
use crate::service::UseCase;
use crate::{FeedyError, Result};

const SUBSCRIBE: &str = "subscribe";
const UNSUBSCRIBE: &str = "unsubscribe";
const LIST_SUBSCRIPTIONS: &str = "listSubscriptions";
const AUTO_COMPLETE_UNSUBSCRIBE: &str = "autoCompleteUnsubscribe";

/// PUT /channeltalk/function
pub async fn function(
    State(usecase): State<Arc<UseCase>>,
    payload: std::result::Result<Json<FunctionRequest>, JsonRejection>,
) -> Json<FunctionResponse> {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(e) => {
            error!("Invalid function request: {}", e);
            return Json(FunctionResponse::success());
        }
    };

    match handle(&usecase, &req).await {
        Ok(res) => Json(res),
        Err(e) => {
            error!("Function {} failed: {}", req.method, e);
            Json(FunctionResponse::success())
        }
    }
}

/// Run one invocation, turning expected errors into a group notice.
pub async fn handle(usecase: &UseCase, req: &FunctionRequest) -> Result<FunctionResponse> {
    debug!(
        method = %req.method,
        channel_id = req.channel_id(),
        chat_type = %req.params.chat.kind,
        chat_id = req.group_id(),
        "function request"
    );

    // Only group chats map onto a subscription target.
    if req.params.chat.kind != "group" {
        return Err(FeedyError::Validation(format!(
            "not allowed chat type: {}",
            req.params.chat.kind
        )));
    }

    match dispatch(usecase, req).await {
        Err(e) if e.is_expected() => {
            let reason = e.reason().unwrap_or_default();
            debug!("Expected error: {} ({:?})", reason, e);
            if let Err(notify_err) = usecase
                .notify(req.channel_id(), req.group_id(), reason)
                .await
            {
                error!("Failed to deliver error notice: {}", notify_err);
            }
            Ok(FunctionResponse::success())
        }
        other => other,
    }
}

async fn dispatch(usecase: &UseCase, req: &FunctionRequest) -> Result<FunctionResponse> {
    let channel_id = req.channel_id();
    let group_id = req.group_id();

    match req.method.as_str() {
        SUBSCRIBE => {
            let input: SubscribeInput = decode_input(req)?;
            usecase
                .subscribe(&req.actor(), channel_id, group_id, &input.url, &input.botname)
                .await?;
            Ok(FunctionResponse::success())
        }
        UNSUBSCRIBE => {
            let input: UnsubscribeInput = decode_input(req)?;
            let feed_id = input.id.parse().ok_or_else(|| {
                FeedyError::expected(format!("Invalid feed id: {}", input.id))
            })?;
            usecase
                .unsubscribe(&req.actor(), channel_id, group_id, feed_id)
                .await?;
            Ok(FunctionResponse::success())
        }
        LIST_SUBSCRIPTIONS => {
            usecase
                .list_subscribed_feeds(channel_id, group_id, true)
                .await?;
            Ok(FunctionResponse::success())
        }
        AUTO_COMPLETE_UNSUBSCRIBE => {
            let feeds = usecase
                .list_subscribed_feeds(channel_id, group_id, false)
                .await?;
            let choices = feeds
                .into_iter()
                .map(|f| Choice {
                    name: f.name,
                    value: f.id.to_string(),
                })
                .collect();
            Ok(FunctionResponse::choices(choices))
        }
        method => Err(FeedyError::Validation(format!(
            "method not supported: {method}"
        ))),
    }
}

fn decode_input<T: DeserializeOwned>(req: &FunctionRequest) -> Result<T> {
    serde_json::from_value(req.params.input.clone())
        .map_err(|e| FeedyError::Validation(format!("invalid {} input: {e}", req.method)))
}
