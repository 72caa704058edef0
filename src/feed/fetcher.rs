//! Feed fetcher with security measures.
//!
//! This module fetches RSS/Atom feeds with SSRF protection and resource
//! limits, and normalizes entries into [`Item`]s ready for rendering.

use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{Feed, Item, Link, ParsedFeed};
use crate::config::FetcherConfig;
use crate::error::{FeedyError, Result};

/// User agent string for feed fetching.
const USER_AGENT: &str = concat!("feedy/", env!("CARGO_PKG_VERSION"), " (RSS Notifier)");

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a\s+href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});

/// Markup-shaped tags only: comments, declarations, closing tags and opening
/// tags whose attributes all carry a value. A bare `<` in prose never matches.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<[!?][^<>]*>|</[A-Za-z][A-Za-z0-9-]*\s*>|<[A-Za-z][A-Za-z0-9-]*(?:\s+[A-Za-z_:][\w:.-]*\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'<>]+))*\s*/?>"#,
    )
    .unwrap()
});

/// Source of parsed feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;

    /// Items of a registered feed, newest first.
    async fn fetch_items(&self, feed: &Feed) -> Result<Vec<Item>> {
        Ok(self.fetch(&feed.url).await?.items)
    }
}

/// Feed source reading over HTTP.
pub struct HttpFeedSource {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl HttpFeedSource {
    /// Create a new fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedyError::Feed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_feed_size {
            return Err(FeedyError::Feed(format!(
                "feed too large: {} bytes (max {} bytes)",
                size, self.max_feed_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    /// Performs SSRF validation and enforces the size limit.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        validate_url(url, self.allow_private_hosts)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedyError::Feed(format!("failed to fetch feed: {e}")))?;

        if !response.status().is_success() {
            return Err(FeedyError::Feed(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedyError::Feed(format!("failed to read response: {e}")))?;
        self.check_size(bytes.len() as u64)?;

        parse_feed(&bytes)
    }
}

/// Validate a URL for SSRF protection.
///
/// The scheme must be http or https. Unless `allow_private_hosts` is set,
/// private, loopback and link-local addresses and internal hostnames are
/// rejected as well.
pub fn validate_url(url: &str, allow_private_hosts: bool) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| FeedyError::Feed(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedyError::Feed(format!("unsupported URL scheme: {scheme}")));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedyError::Feed("URL has no host".to_string()))?;

    if allow_private_hosts {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FeedyError::Feed(format!("forbidden host: {domain}")));
            }
        }
        url::Host::Ipv4(ipv4) => check_ip(IpAddr::V4(ipv4))?,
        url::Host::Ipv6(ipv6) => check_ip(IpAddr::V6(ipv6))?,
    }

    Ok(())
}

fn check_ip(ip: IpAddr) -> Result<()> {
    if is_private_ip(&ip) {
        return Err(FeedyError::Feed(format!(
            "private IP address not allowed: {ip}"
        )));
    }
    Ok(())
}

/// Check if a hostname is forbidden.
fn is_forbidden_hostname(host: &str) -> bool {
    let host_lower = host.to_lowercase();

    if host_lower == "localhost" {
        return true;
    }

    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    FORBIDDEN_SUFFIXES
        .iter()
        .any(|suffix| host_lower.ends_with(suffix))
}

/// Check if an IP address is private/reserved.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Documentation: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
                || (octets[0] == 192 && octets[1] == 0 && octets[2] == 2)
                || (octets[0] == 198 && octets[1] == 51 && octets[2] == 100)
                || (octets[0] == 203 && octets[1] == 0 && octets[2] == 113)
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Parse feed bytes into a ParsedFeed.
///
/// Entries without a published or updated timestamp are dropped. Items are
/// returned newest first; entries with equal timestamps keep document order.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed =
        parser::parse(bytes).map_err(|e| FeedyError::Feed(format!("failed to parse feed: {e}")))?;

    let title = feed
        .title
        .map(|t| html_escape::decode_html_entities(&t.content).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Feed".to_string());

    let mut items: Vec<Item> = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let Some(published_at) = entry.published.or(entry.updated) else {
            warn!(entry_id = %entry.id, "skipping entry without timestamp");
            continue;
        };

        let item_title = entry
            .title
            .map(|t| sanitize(&t.content))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();
        let raw = entry
            .summary
            .map(|t| t.content)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let (extra_link, remaining) = extract_link(&raw);

        items.push(Item {
            title: item_title,
            link,
            content: sanitize(&remaining),
            extra_links: extra_link.into_iter().collect(),
            published_at,
        });
    }

    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    debug!(title = %title, count = items.len(), "parsed feed");

    Ok(ParsedFeed { title, items })
}

/// Pull the first `<a href="...">...</a>` out of `html`.
///
/// Returns the link, if any, and the input with the matched anchor removed.
fn extract_link(html: &str) -> (Option<Link>, String) {
    let Some(caps) = ANCHOR_RE.captures(html) else {
        return (None, html.to_string());
    };
    let (Some(whole), Some(href), Some(text)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return (None, html.to_string());
    };

    let link = Link {
        value: plain_text(text.as_str()),
        url: html_escape::decode_html_entities(href.as_str()).into_owned(),
    };

    let mut remaining = String::with_capacity(html.len());
    remaining.push_str(&html[..whole.start()]);
    remaining.push_str(&html[whole.end()..]);

    (Some(link), remaining)
}

/// Markup-free text with entities decoded and whitespace runs collapsed.
fn plain_text(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, "");
    let without_tags = TAG_RE.replace_all(&without_blocks, "");
    html_escape::decode_html_entities(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip markup and re-escape the text so it is inert inside message markup.
fn sanitize(html: &str) -> String {
    html_escape::encode_text(&plain_text(html)).into_owned()
}
