//! Identity-provider token validation with a concurrent TTL cache.
//!
//! Provider access tokens are opaque, so the only way to verify one is to
//! call the provider's "current user" endpoint with it. Successful results
//! are cached for a short TTL keyed by the raw token value, keeping the hot
//! path free of network calls. Cache keys are sensitive and never logged.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::auth::principal::Principal;
use crate::auth::{AuthError, bearer_token, token_fingerprint};
use crate::types::Subject;

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;

/// Bounded connect/read timeout for provider calls in seconds.
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// A cached validation result for one raw token.
#[derive(Clone)]
struct CacheEntry {
    subject: Subject,
    expires_at: Instant,
}

/// Thread-safe TTL map from raw provider token to resolved subject.
///
/// Expired entries are invisible to readers regardless of whether eviction
/// has run; they are removed lazily on lookup. Writes are last-writer-wins.
pub struct IdentityCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl IdentityCache {
    /// Create a cache with the default TTL of [`DEFAULT_CACHE_TTL_SECONDS`].
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a cache with an explicit TTL (tests compress time this way).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up an unexpired entry for `token`.
    pub async fn lookup(&self, token: &str) -> Option<Subject> {
        {
            let entries = self.entries.read().await;
            match entries.get(token) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.subject.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // The entry looked expired under the read lock. Re-check under the
        // write lock so a concurrent fresh insert is never removed.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(token) {
            if entry.expires_at > Instant::now() {
                return Some(entry.subject.clone());
            }
            entries.remove(token);
        }
        None
    }

    /// Store a validation result; overwrites any existing entry.
    pub async fn insert(&self, token: &str, subject: Subject) {
        let entry = CacheEntry {
            subject,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(token.to_string(), entry);
    }

    /// Eagerly remove an entry, used when the provider rejects the token.
    pub async fn evict(&self, token: &str) {
        self.entries.write().await.remove(token);
    }

    /// Number of stored entries, expired or not.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates provider access tokens, cache-first.
pub struct RemoteTokenValidator {
    api_base: Url,
    cache: IdentityCache,
    client: reqwest::Client,
}

impl RemoteTokenValidator {
    /// Create a validator owning the given cache.
    ///
    /// The HTTP client carries a bounded timeout so a slow provider cannot
    /// stall the authentication gate indefinitely.
    pub fn new(api_base: Url, cache: IdentityCache) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            cache,
            client,
        })
    }

    /// The cache owned by this validator.
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Validate a `Bearer <token>` header value against the provider.
    ///
    /// A cache hit returns with zero network calls. A miss issues exactly
    /// one bounded call; there is no in-request retry and no coalescing of
    /// concurrent callers presenting the same token.
    pub async fn validate(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let token = bearer_token(header).ok_or(AuthError::NoCredential)?;

        if let Some(subject) = self.cache.lookup(token).await {
            return Ok(Principal::new(subject));
        }

        let url = format!("{}/users/@me", self.api_base.as_str().trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::UpstreamUnavailable("provider request timed out".to_string())
                } else {
                    AuthError::UpstreamUnavailable(format!("provider request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status.is_client_error() {
            // Explicit rejection: a previously cached entry for this token
            // is now stale (the token may have been revoked).
            self.cache.evict(token).await;
            debug!(
                fingerprint = %token_fingerprint(token),
                %status,
                "provider rejected token"
            );
            return Err(AuthError::InvalidCredential(format!(
                "provider returned {}",
                status
            )));
        }

        if !status.is_success() {
            debug!(
                fingerprint = %token_fingerprint(token),
                %status,
                "unexpected provider response status"
            );
            return Err(AuthError::InvalidCredential(format!(
                "provider returned {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AuthError::InvalidCredential(format!("unreadable provider response: {}", e))
        })?;

        let subject = coerce_identity(&body).ok_or_else(|| {
            AuthError::InvalidCredential("provider response missing 'id'".to_string())
        })?;

        self.cache.insert(token, subject.clone()).await;

        Ok(Principal::new(subject))
    }
}

/// Coerce the provider's `id` field (string or number) to a subject.
pub(crate) fn coerce_identity(body: &Value) -> Option<Subject> {
    match body.get("id")? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Subject::new(trimmed))
            }
        }
        Value::Number(n) => Some(Subject::new(n.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cache_hit_returns_subject() {
        let cache = IdentityCache::new();
        cache.insert("tok1", Subject::new("99")).await;

        assert_eq!(cache.lookup("tok1").await, Some(Subject::new("99")));
        assert_eq!(cache.lookup("tok2").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_invisible_and_lazily_removed() {
        let cache = IdentityCache::with_ttl(Duration::ZERO);
        cache.insert("tok1", Subject::new("99")).await;

        assert_eq!(cache.entry_count().await, 1);
        assert_eq!(cache.lookup("tok1").await, None);
        // The expired entry was removed by the lookup.
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_removes_entry() {
        let cache = IdentityCache::new();
        cache.insert("tok1", Subject::new("99")).await;
        cache.evict("tok1").await;

        assert_eq!(cache.lookup("tok1").await, None);
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_insert_overwrites_last_writer_wins() {
        let cache = IdentityCache::new();
        cache.insert("tok1", Subject::new("old")).await;
        cache.insert("tok1", Subject::new("new")).await;

        assert_eq!(cache.lookup("tok1").await, Some(Subject::new("new")));
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_leave_one_entry() {
        let cache = Arc::new(IdentityCache::new());

        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.insert("tok1", Subject::new(i.to_string())).await;
                cache.lookup("tok1").await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(cache.entry_count().await, 1);
    }

    #[test]
    fn test_coerce_identity_string() {
        let body = serde_json::json!({"id": "99", "username": "tester"});
        assert_eq!(coerce_identity(&body), Some(Subject::new("99")));
    }

    #[test]
    fn test_coerce_identity_number() {
        let body = serde_json::json!({"id": 99});
        assert_eq!(coerce_identity(&body), Some(Subject::new("99")));
    }

    #[test]
    fn test_coerce_identity_missing_or_blank() {
        assert_eq!(coerce_identity(&serde_json::json!({})), None);
        assert_eq!(coerce_identity(&serde_json::json!({"id": ""})), None);
        assert_eq!(coerce_identity(&serde_json::json!({"id": "  "})), None);
        assert_eq!(coerce_identity(&serde_json::json!({"id": null})), None);
    }
}
