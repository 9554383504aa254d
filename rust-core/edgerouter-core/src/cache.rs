//! # Response Caching
//!
//! Read-through caching for GET routes and invalidation for PUT/DELETE,
//! layered over an external key/value content cache.
//!
//! ## Cache keys
//!
//! Keys are request-shaped: the GET method plus the request URL, suffixed
//! with `v=<version>` when a version is configured. Bumping the version
//! orphans every entry of the previous deployment without deleting them.
//!
//! ## Configuration
//!
//! `pathname` entries are route patterns, optionally carrying their own
//! freshness as `"/pattern,seconds"`; entries without one use `maxage`.

use crate::config::CacheConfig;
use crate::middleware::BoxFuture;
use crate::response::Response;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key of a cached response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Method of the cached request (always GET for route caching)
    pub method: hyper::Method,
    /// Full request URL, including the version suffix
    pub url: String,
}

impl CacheKey {
    /// Key for a GET to `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: hyper::Method::GET,
            url: url.into(),
        }
    }
}

/// External content-cache collaborator
///
/// Point reads and writes only; the router never coordinates concurrent
/// writers beyond "last write wins".
pub trait CacheStore: Send + Sync {
    /// Look up a cached response
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<Response>>;

    /// Store a response
    fn put<'a>(&'a self, key: CacheKey, response: Response) -> BoxFuture<'a, ()>;

    /// Delete a response, returning whether an entry existed
    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, bool>;
}

/// In-process [`CacheStore`]
///
/// Entries expire after the `s-maxage` of their `Cache-Control` header;
/// an expired entry reads as a miss and is dropped on lookup. Responses
/// stored without `s-maxage` never expire.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CachedEntry>>,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    response: Response,
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn new(response: Response) -> Self {
        let expires_at = shared_max_age(&response)
            .and_then(|ttl| Instant::now().checked_add(ttl));
        Self {
            response,
            expires_at,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// `s-maxage` directive of a response's `Cache-Control` header
fn shared_max_age(response: &Response) -> Option<Duration> {
    response
        .header("cache-control")?
        .split(',')
        .filter_map(|directive| directive.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("s-maxage"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl MemoryCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fresh entries
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map_or(0, |e| e.values().filter(|entry| entry.is_fresh(now)).count())
    }

    /// Whether the cache holds no fresh entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check for a fresh entry without going through the async contract
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .map_or(false, |e| e.get(key).is_some_and(|entry| entry.is_fresh(now)))
    }
}

impl CacheStore for MemoryCache {
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<Response>> {
        Box::pin(async move {
            let now = Instant::now();
            {
                let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
                match entries.get(key) {
                    None => return None,
                    Some(entry) if entry.is_fresh(now) => return Some(entry.response.clone()),
                    Some(_) => {}
                }
            }

            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
                entries.remove(key);
                debug!(url = %key.url, "Expired cache entry dropped");
            }
            None
        })
    }

    fn put<'a>(&'a self, key: CacheKey, response: Response) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.insert(key, CachedEntry::new(response));
        })
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.remove(key).is_some()
        })
    }
}

/// One cacheable route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRule {
    /// Route pattern, compared verbatim with the registered pattern
    pub pathname: String,
    /// Freshness in seconds, as sent in `s-maxage`
    pub max_age: String,
}

/// Decides what gets cached, under which key and for how long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    rules: Vec<CacheRule>,
    version: Option<String>,
}

impl CachePolicy {
    /// Build the policy from configuration
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let rules = config
            .pathname
            .iter()
            .map(|entry| match entry.split_once(',') {
                Some((pathname, max_age)) => CacheRule {
                    pathname: pathname.trim().to_string(),
                    max_age: max_age.trim().to_string(),
                },
                None => CacheRule {
                    pathname: entry.clone(),
                    max_age: config.maxage.clone(),
                },
            })
            .collect();

        Self {
            rules,
            version: config.version.clone().filter(|v| !v.is_empty()),
        }
    }

    /// The rule covering a registered route pattern, first match wins
    #[must_use]
    pub fn rule_for(&self, pattern: &str) -> Option<&CacheRule> {
        self.rules.iter().find(|rule| rule.pathname == pattern)
    }

    /// Whether writes to this route pattern must invalidate the cache
    #[must_use]
    pub fn covers(&self, pattern: &str) -> bool {
        self.rule_for(pattern).is_some()
    }

    /// Versioned key for a request URL
    #[must_use]
    pub fn key_for(&self, url: &str) -> CacheKey {
        match &self.version {
            Some(version) => {
                let separator = if url.contains('?') { '&' } else { '?' };
                CacheKey::get(format!("{url}{separator}v={version}"))
            }
            None => CacheKey::get(url),
        }
    }

    /// Prepare a fresh response for storage
    ///
    /// Returns `None` for non-success responses, which are never cached.
    /// Otherwise adds the freshness header to the live response and returns
    /// the copy to store.
    pub fn prepare_for_store(rule: &CacheRule, response: &mut Response) -> Option<Response> {
        if !response.is_success() {
            debug!(status = response.status, "Not caching non-success response");
            return None;
        }
        response.append_header("Cache-Control", &format!("s-maxage={}", rule.max_age));
        Some(response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pathname: &[&str], version: Option<&str>) -> CacheConfig {
        CacheConfig {
            pathname: pathname.iter().map(ToString::to_string).collect(),
            maxage: "3600".to_string(),
            version: version.map(ToString::to_string),
        }
    }

    #[test]
    fn test_rule_with_default_max_age() {
        let policy = CachePolicy::from_config(&config(&["/data"], None));
        let rule = policy.rule_for("/data").unwrap();
        assert_eq!(rule.max_age, "3600");
        assert!(policy.rule_for("/other").is_none());
    }

    #[test]
    fn test_rule_with_override() {
        let policy = CachePolicy::from_config(&config(&["/data,60", "/users/:id"], None));
        assert_eq!(policy.rule_for("/data").unwrap().max_age, "60");
        assert_eq!(policy.rule_for("/users/:id").unwrap().max_age, "3600");
        assert!(policy.covers("/data"));
    }

    #[test]
    fn test_override_does_not_leak_into_other_rules() {
        let policy = CachePolicy::from_config(&config(&["/a,10", "/b"], None));
        assert_eq!(policy.rule_for("/a").unwrap().max_age, "10");
        assert_eq!(policy.rule_for("/b").unwrap().max_age, "3600");
    }

    #[test]
    fn test_versioned_key() {
        let policy = CachePolicy::from_config(&config(&["/data"], Some("v1")));
        assert_eq!(
            policy.key_for("http://localhost/data").url,
            "http://localhost/data?v=v1"
        );
        assert_eq!(
            policy.key_for("http://localhost/data?page=2").url,
            "http://localhost/data?page=2&v=v1"
        );
    }

    #[test]
    fn test_unversioned_key() {
        let policy = CachePolicy::from_config(&config(&["/data"], None));
        let key = policy.key_for("http://localhost/data");
        assert_eq!(key, CacheKey::get("http://localhost/data"));
        assert_eq!(key.method, hyper::Method::GET);
    }

    #[test]
    fn test_prepare_for_store() {
        let rule = CacheRule {
            pathname: "/data".to_string(),
            max_age: "120".to_string(),
        };

        let mut ok = Response::json("{}");
        let stored = CachePolicy::prepare_for_store(&rule, &mut ok).unwrap();
        assert_eq!(ok.header("cache-control"), Some("s-maxage=120"));
        assert_eq!(stored, ok);

        let mut failed = Response::json("{}").with_status(500);
        assert!(CachePolicy::prepare_for_store(&rule, &mut failed).is_none());
        assert!(failed.header("cache-control").is_none());
    }

    #[test]
    fn test_memory_cache_contract() {
        let cache = MemoryCache::new();
        let key = CacheKey::get("http://localhost/data");

        tokio_test::block_on(async {
            assert!(cache.lookup(&key).await.is_none());
            cache.put(key.clone(), Response::json(r#"{"a":1}"#)).await;
            assert_eq!(cache.lookup(&key).await.unwrap().body, r#"{"a":1}"#);
            assert!(cache.delete(&key).await);
            assert!(!cache.delete(&key).await);
        });
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_honours_s_maxage() {
        let cache = MemoryCache::new();
        let expired = CacheKey::get("http://localhost/expired");
        let fresh = CacheKey::get("http://localhost/fresh");
        let forever = CacheKey::get("http://localhost/forever");

        tokio_test::block_on(async {
            let zero = Response::json("{}").with_header("Cache-Control", "public, s-maxage=0");
            cache.put(expired.clone(), zero).await;
            let hour = Response::json("{}").with_header("Cache-Control", "s-maxage=3600");
            cache.put(fresh.clone(), hour).await;
            cache.put(forever.clone(), Response::json("{}")).await;

            assert!(!cache.contains(&expired));
            assert!(cache.lookup(&expired).await.is_none());
            assert!(!cache.delete(&expired).await);

            assert!(cache.lookup(&fresh).await.is_some());
            assert!(cache.lookup(&forever).await.is_some());
        });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_shared_max_age() {
        let response = Response::json("{}").with_header("cache-control", "max-age=5, S-MaxAge=90");
        assert_eq!(shared_max_age(&response), Some(Duration::from_secs(90)));
        let response = Response::json("{}").with_header("cache-control", "max-age=5");
        assert_eq!(shared_max_age(&response), None);
        assert_eq!(shared_max_age(&Response::json("{}")), None);
    }
}
