//! Persistence contract for feeds and subscriptions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{AuditLogEntry, Feed, NewFeed, NewSubscription, Subscription};
use crate::Result;

/// Read access plus the entry point for transactional writes.
///
/// Single-row lookups return `Ok(None)` when nothing matches.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    async fn get_feed_by_id(&self, id: i64) -> Result<Option<Feed>>;

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;

    /// All feeds, ordered by id.
    async fn list_feeds(&self) -> Result<Vec<Feed>>;

    async fn list_subscriptions_by_feed(&self, feed_id: i64) -> Result<Vec<Subscription>>;

    /// Feeds a group is subscribed to, ordered by feed id.
    async fn list_subscribed_feeds(&self, channel_id: &str, group_id: &str) -> Result<Vec<Feed>>;

    /// Set a subscription's watermark. Returns whether a row was updated.
    async fn update_subscription_published_at(
        &self,
        id: i64,
        published_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Writes scoped to one transaction.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it back.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn get_feed_by_url(&mut self, url: &str) -> Result<Option<Feed>>;

    async fn create_feed(&mut self, feed: &NewFeed) -> Result<Feed>;

    async fn get_subscription(
        &mut self,
        channel_id: &str,
        group_id: &str,
        feed_id: i64,
    ) -> Result<Option<Subscription>>;

    /// Create a subscription with its watermark at the Unix epoch.
    async fn create_subscription(&mut self, subscription: &NewSubscription)
        -> Result<Subscription>;

    /// Delete by target. Returns the number of rows removed.
    async fn delete_subscription(
        &mut self,
        channel_id: &str,
        group_id: &str,
        feed_id: i64,
    ) -> Result<u64>;

    async fn create_audit_log(&mut self, entry: &AuditLogEntry) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
