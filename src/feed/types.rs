//! Feed types for feedy.

use chrono::{DateTime, Utc};

/// A registered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Feed title at registration time.
    pub name: String,
    /// Feed URL, unique across feeds.
    pub url: String,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Feed title.
    pub name: String,
    /// Feed URL.
    pub url: String,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A group's binding to a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subscription ID.
    pub id: i64,
    /// Channel the group belongs to.
    pub channel_id: String,
    /// Group receiving notifications.
    pub group_id: String,
    /// Subscribed feed.
    pub feed_id: i64,
    /// Display name for notifications, if set.
    pub bot_name: Option<String>,
    /// Watermark: publish time of the newest delivered item.
    pub published_at: DateTime<Utc>,
}

/// New subscription for creation.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    /// Channel ID.
    pub channel_id: String,
    /// Group ID.
    pub group_id: String,
    /// Feed ID.
    pub feed_id: i64,
    /// Display name for notifications.
    pub bot_name: Option<String>,
}

impl NewSubscription {
    /// Create a new subscription.
    ///
    /// An empty bot name is stored as no bot name.
    pub fn new(
        channel_id: impl Into<String>,
        group_id: impl Into<String>,
        feed_id: i64,
        bot_name: &str,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            group_id: group_id.into(),
            feed_id,
            bot_name: (!bot_name.is_empty()).then(|| bot_name.to_string()),
        }
    }
}

/// A hyperlink pulled out of an item body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Anchor text.
    pub value: String,
    /// Target URL.
    pub url: String,
}

/// A feed entry, produced fresh on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item title (escaped for markup).
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Sanitized body text.
    pub content: String,
    /// Hyperlinks extracted from the body.
    pub extra_links: Vec<Link>,
    /// When the item was published.
    pub published_at: DateTime<Utc>,
}

/// Parsed feed data from external source.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// Feed title.
    pub title: String,
    /// Items, newest first.
    pub items: Vec<Item>,
}

/// Audit record for a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Who performed the action.
    pub actor: String,
    /// Action name (`subscribe`, `unsubscribe`).
    pub action: String,
    /// Affected resource.
    pub target: Option<String>,
}

impl AuditLogEntry {
    /// Create a new audit entry.
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            target: Some(target.into()),
        }
    }
}
