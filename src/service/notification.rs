//! Rendering of feed notifications into group messages.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::channeltalk::{
    inline_link, Button, GroupMessage, GroupMessenger, MessageBlock, WriteGroupMessageRequest,
    COLOR_VARIANT_COBALT,
};
use crate::feed::{Feed, Item};
use crate::Result;

/// Sends rendered notifications to chat groups.
#[derive(Clone)]
pub struct Notifier {
    app_name: String,
    messenger: Arc<dyn GroupMessenger>,
}

impl Notifier {
    pub fn new(app_name: impl Into<String>, messenger: Arc<dyn GroupMessenger>) -> Self {
        Self {
            app_name: app_name.into(),
            messenger,
        }
    }

    /// Send blocks and buttons to a group under `bot_name`.
    pub async fn notify(
        &self,
        channel_id: &str,
        group_id: &str,
        bot_name: &str,
        blocks: Vec<MessageBlock>,
        buttons: Vec<Button>,
    ) -> Result<()> {
        let request = WriteGroupMessageRequest {
            channel_id: channel_id.to_string(),
            group_id: group_id.to_string(),
            root_message_id: None,
            broadcast: false,
            dto: GroupMessage {
                blocks,
                request_id: Uuid::new_v4().to_string(),
                bot_name: bot_name.to_string(),
                buttons,
            },
        };

        let response = self.messenger.write_group_message(&request).await?;
        debug!(channel_id, group_id, message_id = %response.message.id, "message sent");
        Ok(())
    }

    /// Send the list of feeds a group is subscribed to.
    pub async fn notify_feeds(&self, channel_id: &str, group_id: &str, feeds: &[Feed]) -> Result<()> {
        self.notify(channel_id, group_id, &self.app_name, feed_list_blocks(feeds), Vec::new())
            .await
    }

    /// Send one feed item. An empty `bot_name` falls back to the app name.
    pub async fn notify_item(
        &self,
        channel_id: &str,
        group_id: &str,
        bot_name: Option<&str>,
        item: &Item,
    ) -> Result<()> {
        let bot_name = match bot_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.app_name,
        };
        let (blocks, buttons) = item_message(item);
        self.notify(channel_id, group_id, bot_name, blocks, buttons)
            .await
    }

    /// Send a plain text notice under the app name. `msg` is escaped, so feed
    /// names and URLs render literally.
    pub async fn notify_string(&self, channel_id: &str, group_id: &str, msg: &str) -> Result<()> {
        self.notify(
            channel_id,
            group_id,
            &self.app_name,
            vec![MessageBlock::text(html_escape::encode_text(msg))],
            Vec::new(),
        )
        .await
    }
}

fn feed_list_blocks(feeds: &[Feed]) -> Vec<MessageBlock> {
    if feeds.is_empty() {
        return vec![MessageBlock::text("No Subscriptions")];
    }

    let bullets = feeds
        .iter()
        .map(|f| {
            MessageBlock::text(format!(
                "ID: {} - {} ({})",
                f.id,
                html_escape::encode_text(&f.name),
                html_escape::encode_text(&f.url)
            ))
        })
        .collect();
    vec![
        MessageBlock::text("Subscriptions"),
        MessageBlock::bullets(bullets),
    ]
}

fn item_message(item: &Item) -> (Vec<MessageBlock>, Vec<Button>) {
    let blocks = vec![
        MessageBlock::text(inline_link(&item.link, &item.title)),
        MessageBlock::text(item.content.clone()),
    ];
    let buttons = item
        .extra_links
        .iter()
        .map(|link| Button::web_link(&link.value, &link.url, COLOR_VARIANT_COBALT))
        .collect();
    (blocks, buttons)
}
