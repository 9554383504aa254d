//! # Router Configuration
//!
//! Everything a session is constructed with. All types deserialize with
//! serde so a host can ship the configuration as JSON or TOML:
//!
//! ```json
//! {
//!   "cache": { "pathname": ["/data", "/posts,60"], "maxage": "3600", "version": "v1" },
//!   "cors": { "origin": ["https://app.example.com"], "credentials": true }
//! }
//! ```

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

/// Session configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    /// Read-through cache policy for GET routes
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    /// CORS policy applied when the session resolves
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

impl RouterConfig {
    /// Empty configuration: no caching, no CORS
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache policy
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the CORS policy
    #[must_use]
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }
}

/// Cacheable route patterns and their freshness
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Route patterns, each optionally `"pattern,seconds"`
    pub pathname: Vec<String>,
    /// Default freshness in seconds
    #[serde(deserialize_with = "string_or_number")]
    pub maxage: String,
    /// Deployment version appended to every cache key
    #[serde(default)]
    pub version: Option<String>,
}

impl CacheConfig {
    /// Cache `pathname` entries for `maxage` seconds
    pub fn new<I, S>(pathname: I, maxage: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pathname: pathname.into_iter().map(Into::into).collect(),
            maxage: maxage.into(),
            version: None,
        }
    }

    /// Set the cache version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Predicate deciding whether a request origin is allowed
pub type OriginPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Which origins CORS allows
#[derive(Clone, Deserialize)]
#[serde(from = "RawOrigin")]
pub enum AllowedOrigins {
    /// Always answer with this value (`*` or a fixed origin)
    Fixed(String),
    /// Echo the request origin when it is in the list
    List(Vec<String>),
    /// Echo the request origin when the predicate accepts it
    Predicate(OriginPredicate),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOrigin {
    One(String),
    Many(Vec<String>),
}

impl From<RawOrigin> for AllowedOrigins {
    fn from(raw: RawOrigin) -> Self {
        match raw {
            RawOrigin::One(origin) => Self::Fixed(origin),
            RawOrigin::Many(origins) => Self::List(origins),
        }
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self::Fixed("*".to_string())
    }
}

impl fmt::Debug for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(origin) => f.debug_tuple("Fixed").field(origin).finish(),
            Self::List(origins) => f.debug_tuple("List").field(origins).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl AllowedOrigins {
    /// Value for `Access-Control-Allow-Origin`, or `None` when the request
    /// origin is not allowed
    #[must_use]
    pub fn resolve(&self, request_origin: &str) -> Option<String> {
        match self {
            Self::Fixed(origin) => Some(origin.clone()),
            Self::List(origins) => origins
                .iter()
                .any(|o| o == request_origin)
                .then(|| request_origin.to_string()),
            Self::Predicate(allow) => allow(request_origin).then(|| request_origin.to_string()),
        }
    }
}

/// CORS policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsConfig {
    /// Allowed origins
    pub origin: AllowedOrigins,
    /// Methods announced in preflight responses
    pub methods: Vec<String>,
    /// Request headers announced in preflight responses
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to the browser
    pub exposed_headers: Vec<String>,
    /// Whether credentials are allowed
    pub credentials: bool,
    /// Preflight cache duration in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: AllowedOrigins::default(),
            methods: to_strings(&["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]),
            allowed_headers: to_strings(&["Content-Type", "Authorization"]),
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: 86_400,
        }
    }
}

impl CorsConfig {
    /// Permissive defaults (`*`, common methods)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Development preset: any origin, no credentials, HEAD included
    #[must_use]
    pub fn dev_mode() -> Self {
        Self {
            methods: to_strings(&["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"]),
            ..Self::default()
        }
    }

    /// Production preset: explicit origin list with credentials
    #[must_use]
    pub fn production<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origin: AllowedOrigins::List(origins.into_iter().map(Into::into).collect()),
            methods: to_strings(&["GET", "POST", "PUT", "DELETE", "PATCH"]),
            credentials: true,
            ..Self::default()
        }
    }

    /// Set the allowed origins
    #[must_use]
    pub fn with_origin(mut self, origin: AllowedOrigins) -> Self {
        self.origin = origin;
        self
    }

    /// Allow origins accepted by a predicate
    #[must_use]
    pub fn with_origin_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.origin = AllowedOrigins::Predicate(Arc::new(predicate));
        self
    }

    /// Allow credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: bool) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set exposed headers
    #[must_use]
    pub fn with_exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed_headers = headers.into_iter().map(Into::into).collect();
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
