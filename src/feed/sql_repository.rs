//! sqlx implementation of the feed repository.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Executor, Transaction};

use super::repository::{Repository, UnitOfWork};
use super::types::{AuditLogEntry, Feed, NewFeed, NewSubscription, Subscription};
use crate::db::{DbBackend, DbPool};
use crate::{FeedyError, Result};

/// Row type for feed from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    name: String,
    url: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
        }
    }
}

/// Row type for subscription from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    bot_name: Option<String>,
    feed_id: i64,
    channel_id: String,
    group_id: String,
    published_at: String,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = FeedyError;

    fn try_from(row: SubscriptionRow) -> Result<Self> {
        let published_at = parse_datetime(&row.published_at).ok_or_else(|| {
            FeedyError::Database(format!(
                "subscription {} has invalid published_at: {}",
                row.id, row.published_at
            ))
        })?;
        Ok(Subscription {
            id: row.id,
            channel_id: row.channel_id,
            group_id: row.group_id,
            feed_id: row.feed_id,
            bot_name: row.bot_name,
            published_at,
        })
    }
}

/// Repository backed by the connection pool.
#[derive(Clone)]
pub struct SqlRepository {
    pool: DbPool,
}

impl SqlRepository {
    /// Create a new repository instance.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqlRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqlUnitOfWork { tx }))
    }

    async fn get_feed_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>("SELECT id, name, url FROM feeds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        select_feed_by_url(&self.pool, url).await
    }

    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>("SELECT id, name, url FROM feeds ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    async fn list_subscriptions_by_feed(&self, feed_id: i64) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, bot_name, feed_id, channel_id, group_id, published_at
            FROM subscriptions
            WHERE feed_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn list_subscribed_feeds(&self, channel_id: &str, group_id: &str) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
            SELECT f.id, f.name, f.url
            FROM feeds f
            INNER JOIN subscriptions s ON s.feed_id = f.id
            WHERE s.channel_id = $1 AND s.group_id = $2
            ORDER BY f.id ASC
            "#,
        )
        .bind(channel_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    async fn update_subscription_published_at(
        &self,
        id: i64,
        published_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE subscriptions SET published_at = $1 WHERE id = $2")
            .bind(format_datetime(published_at))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Unit of work over one database transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct SqlUnitOfWork {
    tx: Transaction<'static, DbBackend>,
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    async fn get_feed_by_url(&mut self, url: &str) -> Result<Option<Feed>> {
        select_feed_by_url(&mut *self.tx, url).await
    }

    async fn create_feed(&mut self, feed: &NewFeed) -> Result<Feed> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (name, url, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(format_datetime(Utc::now()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Feed {
            id,
            name: feed.name.clone(),
            url: feed.url.clone(),
        })
    }

    async fn get_subscription(
        &mut self,
        channel_id: &str,
        group_id: &str,
        feed_id: i64,
    ) -> Result<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, bot_name, feed_id, channel_id, group_id, published_at
            FROM subscriptions
            WHERE channel_id = $1 AND group_id = $2 AND feed_id = $3
            "#,
        )
        .bind(channel_id)
        .bind(group_id)
        .bind(feed_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn create_subscription(
        &mut self,
        subscription: &NewSubscription,
    ) -> Result<Subscription> {
        let published_at = DateTime::<Utc>::UNIX_EPOCH;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (bot_name, feed_id, channel_id, group_id, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&subscription.bot_name)
        .bind(subscription.feed_id)
        .bind(&subscription.channel_id)
        .bind(&subscription.group_id)
        .bind(format_datetime(published_at))
        .bind(format_datetime(Utc::now()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Subscription {
            id,
            channel_id: subscription.channel_id.clone(),
            group_id: subscription.group_id.clone(),
            feed_id: subscription.feed_id,
            bot_name: subscription.bot_name.clone(),
            published_at,
        })
    }

    async fn delete_subscription(
        &mut self,
        channel_id: &str,
        group_id: &str,
        feed_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM subscriptions WHERE channel_id = $1 AND group_id = $2 AND feed_id = $3",
        )
        .bind(channel_id)
        .bind(group_id)
        .bind(feed_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_audit_log(&mut self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs (actor, action, target, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.target)
        .bind(format_datetime(Utc::now()))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn select_feed_by_url<'e, E>(executor: E, url: &str) -> Result<Option<Feed>>
where
    E: Executor<'e, Database = DbBackend>,
{
    let row = sqlx::query_as::<_, FeedRow>("SELECT id, name, url FROM feeds WHERE url = $1")
        .bind(url)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Feed::from))
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}
