//! feedy - RSS/Atom feed notifier for Channel Talk
//!
//! Groups in a Channel Talk workspace subscribe to feeds through app
//! commands. Publishing fetches each subscribed feed and posts the items
//! a group has not seen yet.

pub mod app;
pub mod channeltalk;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod service;
pub mod web;

pub use app::Application;
pub use config::Config;
pub use db::{Database, DbPool};
pub use error::{FeedyError, Result};
pub use feed::{Feed, FeedSource, Item, Repository, SqlRepository, Subscription};
pub use service::UseCase;
