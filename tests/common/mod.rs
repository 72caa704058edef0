//! Test helpers for integration tests.
//!
//! Provides an in-memory application with fake feed and messaging
//! collaborators, so tests can script feed contents and inspect every
//! message sent to a group.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use feedy::channeltalk::{
    ClientError, GroupMessenger, MessageBlock, MessageRef, WriteGroupMessageRequest,
    WriteGroupMessageResponse,
};
use feedy::feed::{Item, ParsedFeed};
use feedy::{Database, FeedSource, FeedyError, Result, SqlRepository, UseCase};

pub const APP_NAME: &str = "Feedy";
pub const FEED_URL: &str = "https://example.com/feed.xml";
pub const FEED_TITLE: &str = "Example Feed";

/// Feed source serving scripted items.
#[derive(Default)]
pub struct FakeFeedSource {
    title: Mutex<String>,
    items: Mutex<Vec<Item>>,
    failing: Mutex<bool>,
    failing_urls: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl FakeFeedSource {
    pub fn new(title: &str) -> Self {
        let source = Self::default();
        *source.title.lock().unwrap() = title.to_string();
        source
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock().unwrap() = title.to_string();
    }

    pub fn set_items(&self, items: Vec<Item>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Fail fetches of `url` only.
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Every fetched URL, in call order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for FakeFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(url.to_string());
        if *self.failing.lock().unwrap() || self.failing_urls.lock().unwrap().contains(url) {
            return Err(FeedyError::Feed(format!("failed to fetch {url}")));
        }

        // Newest first, as the HTTP source returns them.
        let mut items = self.items.lock().unwrap().clone();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(ParsedFeed {
            title: self.title.lock().unwrap().clone(),
            items,
        })
    }
}

/// Messenger recording every request, optionally failing for some groups
/// or for messages whose first text block contains a pattern.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<WriteGroupMessageRequest>>,
    failing_groups: Mutex<HashSet<String>>,
    failing_texts: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    pub fn fail_for(&self, group_id: &str) {
        self.failing_groups
            .lock()
            .unwrap()
            .insert(group_id.to_string());
    }

    pub fn fail_when_text_contains(&self, pattern: &str) {
        self.failing_texts.lock().unwrap().push(pattern.to_string());
    }

    pub fn sent(&self) -> Vec<WriteGroupMessageRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// First text block of every message sent to `group_id`.
    pub fn texts_for(&self, group_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|req| req.group_id == group_id)
            .filter_map(|req| match req.dto.blocks.first() {
                Some(MessageBlock::Text { value }) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl GroupMessenger for RecordingMessenger {
    async fn write_group_message(
        &self,
        request: &WriteGroupMessageRequest,
    ) -> std::result::Result<WriteGroupMessageResponse, ClientError> {
        let text_fails = match request.dto.blocks.first() {
            Some(MessageBlock::Text { value }) => self
                .failing_texts
                .lock()
                .unwrap()
                .iter()
                .any(|pattern| value.contains(pattern.as_str())),
            _ => false,
        };
        if text_fails || self.failing_groups.lock().unwrap().contains(&request.group_id) {
            return Err(ClientError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(request.clone());
        Ok(WriteGroupMessageResponse {
            message: MessageRef {
                id: format!("msg-{}", sent.len()),
            },
        })
    }
}

/// Use case wired to an in-memory database and fakes.
pub struct TestApp {
    pub db: Database,
    pub repo: Arc<SqlRepository>,
    pub source: Arc<FakeFeedSource>,
    pub messenger: Arc<RecordingMessenger>,
    pub usecase: Arc<UseCase>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let repo = Arc::new(SqlRepository::new(db.pool().clone()));
        let source = Arc::new(FakeFeedSource::new(FEED_TITLE));
        let messenger = Arc::new(RecordingMessenger::default());
        let usecase = Arc::new(UseCase::new(
            APP_NAME,
            repo.clone(),
            source.clone(),
            messenger.clone(),
        ));

        Self {
            db,
            repo,
            source,
            messenger,
            usecase,
        }
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.db.pool())
            .await
            .unwrap();
        count
    }

    pub async fn audit_logs(&self) -> Vec<(String, String, Option<String>)> {
        sqlx::query_as("SELECT actor, action, target FROM audit_logs ORDER BY id")
            .fetch_all(self.db.pool())
            .await
            .unwrap()
    }
}

/// Fixed timestamp `minutes` after a base instant.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub fn item(title: &str, published_at: DateTime<Utc>) -> Item {
    Item {
        title: title.to_string(),
        link: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        content: format!("{title} body"),
        extra_links: Vec::new(),
        published_at,
    }
}
