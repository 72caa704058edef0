//! Feed module for feedy.
//!
//! This module provides feed and subscription persistence and feed fetching.

pub mod fetcher;
pub mod repository;
pub mod sql_repository;
pub mod types;

pub use fetcher::{parse_feed, validate_url, FeedSource, HttpFeedSource};
pub use repository::{Repository, UnitOfWork};
pub use sql_repository::{SqlRepository, SqlUnitOfWork};
pub use types::{AuditLogEntry, Feed, Item, Link, NewFeed, NewSubscription, ParsedFeed, Subscription};
