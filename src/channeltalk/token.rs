//! Short-lived access token cache for the messaging API.
//!
//! Lookup order for a channel:
//! 1. cached and unexpired: returned as is
//! 2. cached but expired: refresh-token exchange, falling through on failure
//! 3. missing, or refresh failed: full issuance from the app secret
//!
//! Concurrent callers for the same channel are not serialized, so two of
//! them may both refresh or issue around the expiry boundary.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::client::ClientError;
use super::dto::IssueTokenResponse;

/// Seconds subtracted from the declared lifetime of every token.
pub const EXPIRY_BUFFER_SECS: i64 = 20;

/// How long an entry stays in the cache, independent of token expiry.
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Credential pair for one channel.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Declared expiry minus [`EXPIRY_BUFFER_SECS`].
    pub expiry: DateTime<Utc>,
}

impl AccessToken {
    pub fn from_response(response: IssueTokenResponse, now: DateTime<Utc>) -> Self {
        let expiry = now + TimeDelta::seconds(response.expires_in)
            - TimeDelta::seconds(EXPIRY_BUFFER_SECS);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expiry,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Remote side of the credential exchange.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue a new credential scoped to `channel_id`.
    async fn issue_token(&self, channel_id: &str) -> Result<AccessToken, ClientError>;

    /// Exchange a refresh token for a new credential.
    async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, ClientError>;
}

struct CacheEntry {
    token: AccessToken,
    stored_at: Instant,
}

/// Access tokens keyed by channel id.
pub struct TokenCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached token for a channel, if its cache entry is still alive.
    pub fn get(&self, channel_id: &str) -> Option<AccessToken> {
        let key = cache_key(channel_id);
        self.entries
            .remove_if(&key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        self.entries.get(&key).map(|entry| entry.token.clone())
    }

    pub fn insert(&self, channel_id: &str, token: AccessToken) {
        self.entries.insert(
            cache_key(channel_id),
            CacheEntry {
                token,
                stored_at: Instant::now(),
            },
        );
    }

    /// Resolve a usable access token for `channel_id`.
    pub async fn access_token(
        &self,
        channel_id: &str,
        issuer: &dyn TokenIssuer,
    ) -> Result<String, ClientError> {
        if let Some(cached) = self.get(channel_id) {
            if !cached.is_expired_at(Utc::now()) {
                debug!(channel_id, from = "cached", "access_token");
                return Ok(cached.access_token);
            }

            match issuer.refresh_token(&cached.refresh_token).await {
                Ok(token) => {
                    debug!(channel_id, from = "refresh_token", "access_token");
                    return Ok(self.store(channel_id, token));
                }
                Err(e) => {
                    debug!(channel_id, error = %e, "refresh failed, issuing a new token");
                }
            }
        }

        let token = issuer.issue_token(channel_id).await?;
        debug!(channel_id, from = "issue_token", "access_token");
        Ok(self.store(channel_id, token))
    }

    fn store(&self, channel_id: &str, token: AccessToken) -> String {
        let access_token = token.access_token.clone();
        self.insert(channel_id, token);
        access_token
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(channel_id: &str) -> String {
    format!("auth:{channel_id}")
}
