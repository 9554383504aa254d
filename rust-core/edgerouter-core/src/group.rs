//! # Route Groups
//!
//! A group rewrites patterns with a shared prefix and prepends shared
//! middlewares, then declares the route on the session like any other.
//! Groups nest: an inner group's prefix and middlewares extend the outer
//! group's.
//!
//! ```
//! use edgerouter_core::{handler, GroupConfig, Request, Router, RouterConfig};
//!
//! # tokio_test::block_on(async {
//! let req = Request::get("https://api.example/api/v1/health").unwrap();
//! let mut router = Router::new(req, RouterConfig::new());
//!
//! let mut api = router.group(GroupConfig::new("/api"));
//! let mut v1 = api.group(GroupConfig::new("/v1"));
//! v1.get("/health", &[], handler(|_req, res| {
//!     Box::pin(async move {
//!         res.text("ok", 200);
//!         Ok(())
//!     })
//! }))
//! .await;
//!
//! assert_eq!(router.resolve().body, "ok");
//! # });
//! ```

use crate::middleware::BoxedHandler;
use crate::router::{Method, Router};

/// Prefix and middlewares shared by a group's routes
#[derive(Clone, Default)]
pub struct GroupConfig {
    /// Pattern prefix, e.g. `/api`
    pub prefix: String,
    /// Middlewares run before each route's own middlewares
    pub middlewares: Vec<BoxedHandler>,
}

impl std::fmt::Debug for GroupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupConfig")
            .field("prefix", &self.prefix)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl GroupConfig {
    /// Group under `prefix` without middlewares
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            middlewares: Vec::new(),
        }
    }

    /// Add a shared middleware
    #[must_use]
    pub fn with_middleware(mut self, middleware: BoxedHandler) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

/// Join a group prefix and a route pattern
///
/// One trailing `/` is dropped from the prefix and the pattern is given a
/// leading `/` when it lacks one.
#[must_use]
pub fn prefix_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// Route declarations scoped to a prefix, borrowing the session
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    config: GroupConfig,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, config: GroupConfig) -> Self {
        Self { router, config }
    }

    /// The group's effective prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Open a nested group
    pub fn group(&mut self, config: GroupConfig) -> RouteGroup<'_> {
        let mut middlewares = self.config.middlewares.clone();
        middlewares.extend(config.middlewares);
        RouteGroup {
            router: &mut *self.router,
            config: GroupConfig {
                prefix: prefix_path(&self.config.prefix, &config.prefix),
                middlewares,
            },
        }
    }

    /// Declare a GET route
    pub async fn get(&mut self, path: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.declare(Method::Get, path, middlewares, handler).await;
    }

    /// Declare a POST route
    pub async fn post(&mut self, path: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.declare(Method::Post, path, middlewares, handler).await;
    }

    /// Declare a PUT route
    pub async fn put(&mut self, path: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.declare(Method::Put, path, middlewares, handler).await;
    }

    /// Declare a DELETE route
    pub async fn delete(&mut self, path: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.declare(Method::Delete, path, middlewares, handler).await;
    }

    async fn declare(
        &mut self,
        method: Method,
        path: &str,
        middlewares: &[BoxedHandler],
        handler: BoxedHandler,
    ) {
        let pattern = prefix_path(&self.config.prefix, path);
        let mut chain = self.config.middlewares.clone();
        chain.extend_from_slice(middlewares);
        self.router.route(method, &pattern, &chain, handler).await;
    }
}
