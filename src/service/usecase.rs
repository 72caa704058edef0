//! Feed synchronization use cases.
//!
//! Subscribe and unsubscribe run their writes and audit record in one unit
//! of work. Publishing delivers every item newer than a subscription's
//! watermark, oldest first, and then advances the watermark to the newest
//! item that was actually delivered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::notification::Notifier;
use crate::channeltalk::GroupMessenger;
use crate::feed::{
    AuditLogEntry, Feed, FeedSource, Item, NewFeed, NewSubscription, Repository, Subscription,
};
use crate::{FeedyError, Result};

/// Entry point for every feed operation triggered by the CLI or the webhook.
#[derive(Clone)]
pub struct UseCase {
    repo: Arc<dyn Repository>,
    source: Arc<dyn FeedSource>,
    notifier: Notifier,
}

impl UseCase {
    pub fn new(
        app_name: impl Into<String>,
        repo: Arc<dyn Repository>,
        source: Arc<dyn FeedSource>,
        messenger: Arc<dyn GroupMessenger>,
    ) -> Self {
        Self {
            repo,
            source,
            notifier: Notifier::new(app_name, messenger),
        }
    }

    /// Feeds a group is subscribed to, optionally posting the list to the group.
    pub async fn list_subscribed_feeds(
        &self,
        channel_id: &str,
        group_id: &str,
        notify: bool,
    ) -> Result<Vec<Feed>> {
        let feeds = self.repo.list_subscribed_feeds(channel_id, group_id).await?;

        if notify {
            self.notifier
                .notify_feeds(channel_id, group_id, &feeds)
                .await?;
        }

        Ok(feeds)
    }

    /// Subscribe a group to the feed at `url`, registering the feed if new.
    ///
    /// # Errors
    ///
    /// Returns an expected error if:
    /// - The URL does not resolve to a parseable feed
    /// - The group is already subscribed to the feed
    /// - The subscription row cannot be created
    ///
    /// A failed confirmation message is returned as an error after the
    /// subscription has been committed.
    pub async fn subscribe(
        &self,
        actor: &str,
        channel_id: &str,
        group_id: &str,
        url: &str,
        bot_name: &str,
    ) -> Result<Subscription> {
        let mut uow = self.repo.begin().await?;

        let feed = match uow.get_feed_by_url(url).await? {
            Some(feed) => feed,
            None => {
                let parsed = self
                    .source
                    .fetch(url)
                    .await
                    .map_err(|e| e.with_reason(format!("Invalid Feed: {url}")))?;
                let feed = uow.create_feed(&NewFeed::new(parsed.title, url)).await?;
                info!("Registered feed {}: {} ({})", feed.id, feed.name, feed.url);
                feed
            }
        };

        if uow
            .get_subscription(channel_id, group_id, feed.id)
            .await?
            .is_some()
        {
            return Err(FeedyError::expected(format!(
                "Already subscribed: {} ({})",
                feed.name, feed.url
            )));
        }

        let subscription = uow
            .create_subscription(&NewSubscription::new(
                channel_id, group_id, feed.id, bot_name,
            ))
            .await
            .map_err(|e| e.with_reason("Failed to subscribe"))?;

        uow.create_audit_log(&AuditLogEntry::new(
            actor,
            "subscribe",
            format!("sub:{}", subscription.id),
        ))
        .await?;
        uow.commit().await?;

        info!(
            "Subscription {} created by {}: feed {} -> {}/{}",
            subscription.id, actor, feed.id, channel_id, group_id
        );

        self.notifier
            .notify_string(
                channel_id,
                group_id,
                &format!("Subscribed: {} ({})", feed.name, feed.url),
            )
            .await?;

        Ok(subscription)
    }

    /// Remove a group's subscription to a feed.
    ///
    /// # Errors
    ///
    /// Returns the expected error `No subscription for feed: <id>` when the
    /// feed does not exist or the group is not subscribed to it. Nothing is
    /// written in that case.
    pub async fn unsubscribe(
        &self,
        actor: &str,
        channel_id: &str,
        group_id: &str,
        feed_id: i64,
    ) -> Result<()> {
        let no_subscription = || format!("No subscription for feed: {feed_id}");

        let feed = self
            .repo
            .get_feed_by_id(feed_id)
            .await
            .map_err(|e| e.with_reason(format!("Failed to get feed {feed_id}")))?
            .ok_or_else(|| FeedyError::expected(no_subscription()))?;

        let mut uow = self.repo.begin().await?;

        let removed = uow
            .delete_subscription(channel_id, group_id, feed_id)
            .await
            .map_err(|e| e.with_reason(no_subscription()))?;
        if removed == 0 {
            return Err(FeedyError::expected(no_subscription()));
        }

        uow.create_audit_log(&AuditLogEntry::new(
            actor,
            "unsubscribe",
            format!("sub:{channel_id}:{group_id}:{feed_id}"),
        ))
        .await?;
        uow.commit().await?;

        info!(
            "Subscription to feed {} removed by {}: {}/{}",
            feed_id, actor, channel_id, group_id
        );

        self.notifier
            .notify_string(
                channel_id,
                group_id,
                &format!("Unsubscribed: {} ({})", feed.name, feed.url),
            )
            .await
    }

    /// Publish new items of one feed to its subscribers.
    pub async fn publish_feed(&self, feed_id: i64) -> Result<()> {
        let feed = self
            .repo
            .get_feed_by_id(feed_id)
            .await?
            .ok_or_else(|| FeedyError::NotFound(format!("feed {feed_id}")))?;

        self.publish(&feed).await
    }

    /// Publish every feed in id order, stopping at the first feed that fails.
    pub async fn publish_all_feeds(&self) -> Result<()> {
        let feeds = self.repo.list_feeds().await?;
        info!("Publishing {} feed(s)", feeds.len());

        for feed in &feeds {
            self.publish(feed).await?;
        }

        Ok(())
    }

    /// Send a plain text notice to a group.
    pub async fn notify(&self, channel_id: &str, group_id: &str, msg: &str) -> Result<()> {
        self.notifier.notify_string(channel_id, group_id, msg).await
    }

    async fn publish(&self, feed: &Feed) -> Result<()> {
        let subscriptions = self.repo.list_subscriptions_by_feed(feed.id).await?;
        if subscriptions.is_empty() {
            debug!("Feed {} has no subscriptions", feed.id);
            return Ok(());
        }

        info!("Fetching feed {}: {}", feed.id, feed.name);
        let items = self.source.fetch_items(feed).await?;
        info!("Fetched {} item(s) from feed {}", items.len(), feed.id);

        for subscription in &subscriptions {
            self.publish_to(subscription, &items).await;
        }

        Ok(())
    }

    /// Deliver pending items to one subscription. Failures are logged only.
    async fn publish_to(&self, subscription: &Subscription, items: &[Item]) {
        info!(
            "Publishing to subscription {} (last published at {})",
            subscription.id, subscription.published_at
        );

        let mut pending: Vec<&Item> = items
            .iter()
            .filter(|item| {
                let is_new = subscription.published_at < item.published_at;
                if !is_new {
                    debug!("Already published item: {}", item.title);
                }
                is_new
            })
            .collect();
        pending.sort_by_key(|item| item.published_at);

        let mut last_published: Option<DateTime<Utc>> = None;
        for item in pending {
            debug!("Delivering item: {}", item.title);
            if let Err(e) = self
                .notifier
                .notify_item(
                    &subscription.channel_id,
                    &subscription.group_id,
                    subscription.bot_name.as_deref(),
                    item,
                )
                .await
            {
                error!(
                    "Notification failed for subscription {}: {}",
                    subscription.id, e
                );
                continue;
            }

            if last_published.map_or(true, |last| last < item.published_at) {
                last_published = Some(item.published_at);
            }
        }

        let Some(published_at) = last_published else {
            return;
        };

        match self
            .repo
            .update_subscription_published_at(subscription.id, published_at)
            .await
        {
            Ok(_) => info!(
                "Subscription {} published up to {}",
                subscription.id, published_at
            ),
            Err(e) => error!(
                "Failed to update subscription {}: {}",
                subscription.id, e
            ),
        }
    }
}
