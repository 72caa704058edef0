//! Channel Talk messaging API.
//!
//! This module provides the rich-text block model, the native function
//! client and the per-channel access token cache.

pub mod block;
pub mod client;
pub mod dto;
pub mod token;

pub use block::{
    bold, emoji, escaped_string, inline_link, italic, mention, variable, Button, MentionType,
    MessageBlock, COLOR_VARIANT_COBALT,
};
pub use client::{Client, ClientError, GroupMessenger};
pub use dto::{
    GroupMessage, IssueTokenResponse, MessageRef, NativeFunction, WriteGroupMessageRequest,
    WriteGroupMessageResponse,
};
pub use token::{AccessToken, TokenCache, TokenIssuer, CACHE_TTL, EXPIRY_BUFFER_SECS};
