//! # Session Router
//!
//! One [`Router`] handles exactly one inbound request. Routes are declared
//! imperatively in program order; the first declaration whose verb and
//! pattern match the request runs its middlewares and handler, and every
//! later declaration becomes a no-op. [`Router::resolve`] produces the
//! final response, falling back to a 404 when nothing resolved.
//!
//! ```
//! use edgerouter_core::{handler, Request, Router, RouterConfig};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let req = Request::get("https://api.example/users/42").unwrap();
//! let mut router = Router::new(req, RouterConfig::new());
//!
//! router
//!     .get("/users/:id", &[], handler(|req, res| {
//!         Box::pin(async move {
//!             let id = req.param("id").unwrap_or_default().to_string();
//!             res.ok(&json!({ "id": id }));
//!             Ok(())
//!         })
//!     }))
//!     .await;
//!
//! let response = router.resolve();
//! assert_eq!(response.status, 200);
//! assert_eq!(response.json_body(), Some(json!({ "id": "42" })));
//! # });
//! ```
//!
//! ## Dispatch order
//!
//! 1. Skip (and remember the pattern) if resolved, wrong verb or no match
//! 2. Attach params; decode queries (GET) or parse the JSON body (POST/PUT)
//! 3. Run the route's middlewares, stopping when one resolves
//! 4. GET: cache read-through; PUT/DELETE: cache invalidation
//! 5. Run the handler
//!
//! Errors from any step go to the error handler and never escape.

use crate::cache::{CacheKey, CachePolicy, CacheRule, CacheStore};
use crate::config::RouterConfig;
use crate::cors::CorsMiddleware;
use crate::error::RouteError;
use crate::group::{GroupConfig, RouteGroup};
use crate::json;
use crate::middleware::{BoxFuture, BoxedHandler, HandlerResult, MiddlewareChain};
use crate::query::decode_query;
use crate::request::Request;
use crate::response::{ErrorBody, Responder, Response};
use crate::route::{Params, RouteMatcher};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP methods routes can be declared for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether an inbound request method is this verb
    #[must_use]
    pub fn matches(self, method: &hyper::Method) -> bool {
        method.as_str() == self.as_str()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom error handler contract
///
/// Receives the route error along with the session's request and
/// responder. Returning `Ok` without resolving falls back to the default
/// error body; returning `Err` falls back to a fixed 500.
pub trait ErrorHandler: Send + Sync {
    /// Handle a route error
    fn call<'a>(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Responder,
    ) -> BoxFuture<'a, HandlerResult>;
}

struct FnErrorHandler<F> {
    f: F,
}

impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: for<'a> Fn(&'a RouteError, &'a mut Request, &'a mut Responder) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    fn call<'a>(
        &'a self,
        err: &'a RouteError,
        req: &'a mut Request,
        res: &'a mut Responder,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.f)(err, req, res)
    }
}

/// Wrap an async closure as an error handler
pub fn error_handler<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: for<'a> Fn(&'a RouteError, &'a mut Request, &'a mut Responder) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnErrorHandler { f })
}

/// Custom not-found handler; runs synchronously inside [`Router::resolve`]
pub type NotFoundHandler =
    Arc<dyn Fn(&mut Request, &mut Responder) -> HandlerResult + Send + Sync>;

/// Per-request routing session
pub struct Router {
    request: Request,
    responder: Responder,
    unmatched: Vec<String>,
    matchers: HashMap<String, Option<RouteMatcher>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    not_found: Option<NotFoundHandler>,
    cache_policy: Option<CachePolicy>,
    cache_store: Option<Arc<dyn CacheStore>>,
    cors: Option<CorsMiddleware>,
    finalized: Option<Response>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("resolved", &self.responder.is_resolved())
            .field("unmatched", &self.unmatched)
            .field("cache_policy", &self.cache_policy)
            .field("cache_store", &self.cache_store.is_some())
            .field("cors", &self.cors)
            .field("finalized", &self.finalized.is_some())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Start a session for one request
    #[must_use]
    pub fn new(request: Request, config: RouterConfig) -> Self {
        Self {
            request,
            responder: Responder::new(),
            unmatched: Vec::new(),
            matchers: HashMap::new(),
            error_handler: None,
            not_found: None,
            cache_policy: config.cache.as_ref().map(CachePolicy::from_config),
            cache_store: None,
            cors: config.cors.map(CorsMiddleware::new),
            finalized: None,
        }
    }

    /// Attach the external content cache used by the cache policy
    #[must_use]
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// The session's request context
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Whether a terminal response has been produced
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.responder.is_resolved()
    }

    /// Patterns declared so far that did not run
    #[must_use]
    pub fn unmatched_patterns(&self) -> &[String] {
        &self.unmatched
    }

    /// Set the error handler, replacing any previous one
    pub fn on_error(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.error_handler = Some(handler);
    }

    /// Set the not-found handler, replacing any previous one
    pub fn not_found<F>(&mut self, handler: F)
    where
        F: Fn(&mut Request, &mut Responder) -> HandlerResult + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(handler));
    }

    /// Start a route group sharing a prefix and middlewares
    pub fn group(&mut self, config: GroupConfig) -> RouteGroup<'_> {
        RouteGroup::new(self, config)
    }

    /// Run session-wide middlewares
    ///
    /// Skipped once the session is resolved; the chain stops at the first
    /// middleware that resolves it.
    pub async fn use_middleware(&mut self, middlewares: &[BoxedHandler]) {
        if self.responder.is_resolved() {
            debug!("Session resolved, skipping global middlewares");
            return;
        }
        let chain = MiddlewareChain::from(middlewares);
        if let Err(err) = chain.run(&mut self.request, &mut self.responder).await {
            self.handle_error(err).await;
        }
    }

    /// Declare a GET route
    pub async fn get(&mut self, pattern: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.dispatch(Method::Get, pattern, middlewares, handler).await;
    }

    /// Declare a POST route
    pub async fn post(&mut self, pattern: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.dispatch(Method::Post, pattern, middlewares, handler).await;
    }

    /// Declare a PUT route
    pub async fn put(&mut self, pattern: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.dispatch(Method::Put, pattern, middlewares, handler).await;
    }

    /// Declare a DELETE route
    pub async fn delete(&mut self, pattern: &str, middlewares: &[BoxedHandler], handler: BoxedHandler) {
        self.dispatch(Method::Delete, pattern, middlewares, handler).await;
    }

    /// Declare a route for any of the supported verbs
    pub async fn route(
        &mut self,
        method: Method,
        pattern: &str,
        middlewares: &[BoxedHandler],
        handler: BoxedHandler,
    ) {
        self.dispatch(method, pattern, middlewares, handler).await;
    }

    async fn dispatch(
        &mut self,
        method: Method,
        pattern: &str,
        middlewares: &[BoxedHandler],
        handler: BoxedHandler,
    ) {
        if self.responder.is_resolved() || !method.matches(self.request.method()) {
            self.unmatched.push(pattern.to_string());
            return;
        }
        let Some(params) = self.match_pattern(pattern) else {
            self.unmatched.push(pattern.to_string());
            return;
        };

        debug!(method = %method, pattern = %pattern, "Route matched");
        self.request.params = params;
        match method {
            Method::Get => self.request.queries = decode_query(self.request.query_string()),
            Method::Post | Method::Put => {
                self.request.body_json = json::parse_body(self.request.body_bytes());
            }
            Method::Delete => {}
        }

        let chain = MiddlewareChain::from(middlewares);
        if let Err(err) = chain.run(&mut self.request, &mut self.responder).await {
            self.handle_error(err).await;
            return;
        }
        if self.responder.is_resolved() {
            debug!(pattern = %pattern, "Resolved by middleware");
            return;
        }

        let outcome = match method {
            Method::Get => self.run_cached(pattern, &handler).await,
            Method::Put | Method::Delete => {
                self.invalidate(pattern).await;
                handler.call(&mut self.request, &mut self.responder).await
            }
            Method::Post => handler.call(&mut self.request, &mut self.responder).await,
        };
        if let Err(err) = outcome {
            self.handle_error(err).await;
        }
    }

    fn match_pattern(&mut self, pattern: &str) -> Option<Params> {
        let path = self.request.path();
        let matcher = self
            .matchers
            .entry(pattern.to_string())
            .or_insert_with(|| match RouteMatcher::compile(pattern) {
                Ok(matcher) => Some(matcher),
                Err(err) => {
                    warn!(error = %err, "Route pattern never matches");
                    None
                }
            });
        matcher.as_ref()?.match_path(path)
    }

    /// GET read-through: serve a cached body or run the handler and store
    /// its success response
    async fn run_cached(&mut self, pattern: &str, handler: &BoxedHandler) -> HandlerResult {
        let Some((rule, key)) = self.cache_entry_for(pattern) else {
            return handler.call(&mut self.request, &mut self.responder).await;
        };
        let Some(store) = self.cache_store.clone() else {
            debug!(pattern = %pattern, "No cache store attached, skipping cache");
            return handler.call(&mut self.request, &mut self.responder).await;
        };

        if let Some(hit) = store.lookup(&key).await {
            match hit.json_body() {
                Some(body) => {
                    debug!(url = %key.url, "Cache hit");
                    self.responder.json(&body, 200);
                    return Ok(());
                }
                None => warn!(url = %key.url, "Cached body is not JSON, treating as miss"),
            }
        }

        debug!(url = %key.url, "Cache miss");
        handler.call(&mut self.request, &mut self.responder).await?;

        let stored = self
            .responder
            .response_mut()
            .and_then(|response| CachePolicy::prepare_for_store(&rule, response));
        if let Some(stored) = stored {
            store.put(key, stored).await;
        }
        Ok(())
    }

    async fn invalidate(&self, pattern: &str) {
        let Some(policy) = self.cache_policy.as_ref().filter(|p| p.covers(pattern)) else {
            return;
        };
        let Some(store) = &self.cache_store else {
            debug!(pattern = %pattern, "No cache store attached, nothing to invalidate");
            return;
        };
        let key = policy.key_for(&self.request.url());
        let existed = store.delete(&key).await;
        debug!(url = %key.url, existed, "Cache entry invalidated");
    }

    fn cache_entry_for(&self, pattern: &str) -> Option<(CacheRule, CacheKey)> {
        let policy = self.cache_policy.as_ref()?;
        let rule = policy.rule_for(pattern)?.clone();
        Some((rule, policy.key_for(&self.request.url())))
    }

    async fn handle_error(&mut self, err: RouteError) {
        warn!(status = err.status_code(), error = %err, "Route error");
        if self.responder.is_resolved() {
            warn!("Session already resolved, keeping existing response");
            return;
        }

        if let Some(on_error) = self.error_handler.clone() {
            match on_error.call(&err, &mut self.request, &mut self.responder).await {
                Ok(()) if self.responder.is_resolved() => return,
                Ok(()) => debug!("Error handler did not resolve, using default error body"),
                Err(handler_err) => {
                    warn!(error = %handler_err, "Error handler failed");
                    if !self.responder.is_resolved() {
                        self.responder.server_error(None);
                    }
                    return;
                }
            }
        }

        self.responder
            .json(&ErrorBody::new(err.message()), err.status_code());
    }

    /// Produce the session's single response
    ///
    /// Falls back to a 404 when no declaration resolved, applies CORS when
    /// configured and any headers deferred by middlewares. Only the first
    /// call does this work; later calls return the same response.
    pub fn resolve(&mut self) -> Response {
        if let Some(finalized) = &self.finalized {
            return finalized.clone();
        }

        if let Some(cors) = &self.cors {
            cors.apply(&self.request, &mut self.responder);
        }
        if !self.responder.is_resolved() {
            self.resolve_not_found();
        }

        let deferred = self.responder.take_deferred_headers();
        if let Some(response) = self.responder.response_mut() {
            for (name, value) in &deferred {
                response.set_header(name, value);
            }
        }

        let response = self
            .responder
            .response()
            .cloned()
            .unwrap_or_else(|| Self::default_not_found(self.request.path()));
        self.finalized = Some(response.clone());
        response
    }

    fn resolve_not_found(&mut self) {
        let path = self.request.path().to_string();
        let patterns = self.unmatched.clone();
        let other_verb = patterns
            .iter()
            .any(|pattern| self.match_pattern(pattern).is_some());

        if other_verb {
            debug!(path = %path, "Path declared for another method");
            self.responder.send(Self::default_not_found(&path));
            return;
        }

        if let Some(not_found) = self.not_found.clone() {
            match not_found(&mut self.request, &mut self.responder) {
                Ok(()) if self.responder.is_resolved() => return,
                Ok(()) => warn!("Not-found handler did not resolve"),
                Err(err) => warn!(error = %err, "Not-found handler failed"),
            }
            if self.responder.is_resolved() {
                return;
            }
        }

        debug!(path = %path, "No route matched");
        self.responder.send(Self::default_not_found(&path));
    }

    fn default_not_found(path: &str) -> Response {
        let body = json!({ "error": "Not Found", "path": path });
        Response::json(body.to_string()).with_status(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{CacheConfig, CorsConfig};
    use crate::middleware::handler;
    use hyper::body::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(method: hyper::Method, url: &str) -> Router {
        let req = Request::new(method, url, HashMap::new(), None).unwrap();
        Router::new(req, RouterConfig::new())
    }

    fn reply(tag: &'static str) -> BoxedHandler {
        handler(move |_req, res| {
            Box::pin(async move {
                res.ok(&json!({ "route": tag }));
                Ok(())
            })
        })
    }

    fn counting(counter: &Arc<AtomicUsize>) -> BoxedHandler {
        let counter = Arc::clone(counter);
        handler(move |_req, res| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                res.ok(&json!({ "calls": n }));
                Ok(())
            })
        })
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
        assert!(Method::Post.matches(&hyper::Method::POST));
        assert!(!Method::Post.matches(&hyper::Method::PUT));
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let mut router = session(hyper::Method::GET, "http://localhost/a");
        router.get("/a", &[], reply("first")).await;
        router.get("/a", &[], reply("second")).await;

        assert_eq!(router.resolve().json_body(), Some(json!({ "route": "first" })));
        assert_eq!(router.unmatched_patterns(), ["/a"]);
    }

    #[tokio::test]
    async fn test_params_and_queries_attached() {
        let mut router = session(hyper::Method::GET, "http://localhost/users/7?active=true");
        router
            .get(
                "/users/:id",
                &[],
                handler(|req, res| {
                    Box::pin(async move {
                        res.ok(&json!({
                            "id": req.param("id"),
                            "active": req.query("active"),
                        }));
                        Ok(())
                    })
                }),
            )
            .await;

        assert_eq!(
            router.resolve().json_body(),
            Some(json!({ "id": "7", "active": true }))
        );
    }

    #[tokio::test]
    async fn test_post_body_parsed_or_absent() {
        let echo = || {
            handler(|req, res| {
                Box::pin(async move {
                    res.ok(&json!({ "body": req.body_json }));
                    Ok(())
                })
            })
        };

        let req = Request::new(
            hyper::Method::POST,
            "http://localhost/items",
            HashMap::new(),
            Some(Bytes::from_static(br#"{"name":"pen"}"#)),
        )
        .unwrap();
        let mut router = Router::new(req, RouterConfig::new());
        router.post("/items", &[], echo()).await;
        assert_eq!(
            router.resolve().json_body(),
            Some(json!({ "body": { "name": "pen" } }))
        );

        let req = Request::new(
            hyper::Method::POST,
            "http://localhost/items",
            HashMap::new(),
            Some(Bytes::from_static(b"{not json")),
        )
        .unwrap();
        let mut router = Router::new(req, RouterConfig::new());
        router.post("/items", &[], echo()).await;
        assert_eq!(router.resolve().json_body(), Some(json!({ "body": null })));
    }

    #[tokio::test]
    async fn test_middleware_resolution_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let deny = handler(|_req, res| {
            Box::pin(async move {
                res.unauthorized(None);
                Ok(())
            })
        });

        let mut router = session(hyper::Method::GET, "http://localhost/private");
        router.get("/private", &[deny], counting(&calls)).await;

        let response = router.resolve();
        assert_eq!(response.status, 401);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_error_handler() {
        let mut router = session(hyper::Method::GET, "http://localhost/boom");
        router
            .get(
                "/boom",
                &[],
                handler(|_req, _res| Box::pin(async move { Err(RouteError::conflict("taken")) })),
            )
            .await;

        let response = router.resolve();
        assert_eq!(response.status, 409);
        assert_eq!(response.json_body(), Some(json!({ "error": "taken" })));
    }

    #[tokio::test]
    async fn test_custom_error_handler() {
        let mut router = session(hyper::Method::GET, "http://localhost/boom");
        router.on_error(error_handler(|err, _req, res| {
            Box::pin(async move {
                res.json(&json!({ "oops": err.message() }), 418);
                Ok(())
            })
        }));
        router
            .get(
                "/boom",
                &[],
                handler(|_req, _res| Box::pin(async move { Err(RouteError::other("bad")) })),
            )
            .await;

        let response = router.resolve();
        assert_eq!(response.status, 418);
        assert_eq!(response.json_body(), Some(json!({ "oops": "bad" })));
    }

    #[tokio::test]
    async fn test_failing_error_handler_falls_back_to_500() {
        let mut router = session(hyper::Method::GET, "http://localhost/boom");
        router.on_error(error_handler(|_err, _req, _res| {
            Box::pin(async move { Err(RouteError::other("handler broke")) })
        }));
        router
            .get(
                "/boom",
                &[],
                handler(|_req, _res| Box::pin(async move { Err(RouteError::bad_request("x")) })),
            )
            .await;

        let response = router.resolve();
        assert_eq!(response.status, 500);
        assert_eq!(
            response.json_body(),
            Some(json!({ "error": "Internal Server Error" }))
        );
    }

    #[tokio::test]
    async fn test_not_found_default_body() {
        let mut router = session(hyper::Method::GET, "http://localhost/missing");
        router.get("/other", &[], reply("other")).await;

        let response = router.resolve();
        assert_eq!(response.status, 404);
        assert_eq!(
            response.json_body(),
            Some(json!({ "error": "Not Found", "path": "/missing" }))
        );
    }

    #[tokio::test]
    async fn test_wrong_verb_is_still_404() {
        let mut router = session(hyper::Method::POST, "http://localhost/users");
        router.not_found(|_req, res| {
            res.text("custom", 404);
            Ok(())
        });
        router.get("/users", &[], reply("list")).await;

        let response = router.resolve();
        assert_eq!(response.status, 404);
        assert_eq!(response.json_body().unwrap()["path"], "/users");
    }

    #[tokio::test]
    async fn test_custom_not_found_and_fallback() {
        let mut router = session(hyper::Method::GET, "http://localhost/nowhere");
        router.not_found(|req, res| {
            res.not_found(Some(format!("{} is gone", req.path()).as_str()));
            Ok(())
        });
        assert_eq!(
            router.resolve().json_body(),
            Some(json!({ "error": "/nowhere is gone" }))
        );

        let mut router = session(hyper::Method::GET, "http://localhost/nowhere");
        router.not_found(|_req, _res| Err(RouteError::other("broken")));
        let response = router.resolve();
        assert_eq!(response.status, 404);
        assert_eq!(response.json_body().unwrap()["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable() {
        let mut router = session(hyper::Method::GET, "http://localhost/a");
        router.get("/a", &[], reply("a")).await;
        assert_eq!(router.resolve(), router.resolve());
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable_for_cors_preflight() {
        let config = RouterConfig::new()
            .with_cors(CorsConfig::new().with_exposed_headers(["X-Total"]));
        let req = Request::new(hyper::Method::OPTIONS, "http://localhost/a", HashMap::new(), None)
            .unwrap();
        let mut router = Router::new(req, config);
        router.get("/a", &[], reply("a")).await;

        let first = router.resolve();
        assert_eq!(first.status, 204);
        assert!(first.header("access-control-expose-headers").is_none());
        assert_eq!(router.resolve(), first);
        assert_eq!(router.resolve(), first);
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable_with_deferred_headers() {
        let config = RouterConfig::new()
            .with_cors(CorsConfig::new().with_exposed_headers(["X-Total"]));
        let req = Request::get("http://localhost/a").unwrap();
        let mut router = Router::new(req, config);
        router.get("/a", &[], reply("a")).await;

        let first = router.resolve();
        assert_eq!(first.header("access-control-expose-headers"), Some("X-Total"));
        assert_eq!(router.resolve(), first);
    }

    #[tokio::test]
    async fn test_global_middleware_error_and_skip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail = handler(|_req, _res| Box::pin(async move { Err(RouteError::forbidden("no")) }));

        let mut router = session(hyper::Method::GET, "http://localhost/a");
        router.use_middleware(&[fail]).await;
        router.get("/a", &[], counting(&calls)).await;

        assert_eq!(router.resolve().status, 403);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_pattern_never_matches() {
        let mut router = session(hyper::Method::GET, "http://localhost/a/b");
        router.get("/a/:x/:x", &[], reply("dup")).await;
        router.get("/a/:x", &[], reply("ok")).await;
        assert_eq!(router.resolve().json_body(), Some(json!({ "route": "ok" })));
    }

    #[tokio::test]
    async fn test_cache_read_through() {
        let store = Arc::new(MemoryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let config = RouterConfig::new().with_cache(CacheConfig::new(["/data"], "60"));

        for expected_calls in [1, 1] {
            let req = Request::get("http://localhost/data").unwrap();
            let mut router = Router::new(req, config.clone()).with_cache_store(store.clone());
            router.get("/data", &[], counting(&calls)).await;
            let response = router.resolve();

            assert_eq!(response.json_body(), Some(json!({ "calls": 1 })));
            assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
        }
        assert!(store.contains(&CacheKey::get("http://localhost/data")));
    }

    #[tokio::test]
    async fn test_cache_miss_sets_freshness_header() {
        let store = Arc::new(MemoryCache::new());
        let config = RouterConfig::new().with_cache(CacheConfig::new(["/data,120"], "60"));
        let req = Request::get("http://localhost/data").unwrap();
        let mut router = Router::new(req, config).with_cache_store(store);
        router.get("/data", &[], reply("data")).await;

        assert_eq!(router.resolve().header("cache-control"), Some("s-maxage=120"));
    }

    #[tokio::test]
    async fn test_cache_skips_error_responses() {
        let store = Arc::new(MemoryCache::new());
        let config = RouterConfig::new().with_cache(CacheConfig::new(["/data"], "60"));
        let req = Request::get("http://localhost/data").unwrap();
        let mut router = Router::new(req, config).with_cache_store(store.clone());
        router
            .get(
                "/data",
                &[],
                handler(|_req, res| {
                    Box::pin(async move {
                        res.server_error(None);
                        Ok(())
                    })
                }),
            )
            .await;

        assert_eq!(router.resolve().status, 500);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cache_without_store_runs_handler() {
        let config = RouterConfig::new().with_cache(CacheConfig::new(["/data"], "60"));
        let req = Request::get("http://localhost/data").unwrap();
        let mut router = Router::new(req, config);
        router.get("/data", &[], reply("data")).await;
        assert_eq!(router.resolve().status, 200);
    }

    #[tokio::test]
    async fn test_delete_invalidates() {
        let store = Arc::new(MemoryCache::new());
        let key = CacheKey::get("http://localhost/data");
        store.put(key.clone(), Response::json("{}")).await;

        let config = RouterConfig::new().with_cache(CacheConfig::new(["/data"], "60"));
        let req = Request::new(hyper::Method::DELETE, "http://localhost/data", HashMap::new(), None)
            .unwrap();
        let mut router = Router::new(req, config).with_cache_store(store.clone());
        router
            .delete(
                "/data",
                &[],
                handler(|_req, res| {
                    Box::pin(async move {
                        res.no_content();
                        Ok(())
                    })
                }),
            )
            .await;

        assert_eq!(router.resolve().status, 204);
        assert!(!store.contains(&key));
    }

    #[tokio::test]
    async fn test_config_cors_preflight_and_headers() {
        let config = RouterConfig::new().with_cors(CorsConfig::new());

        let req = Request::new(hyper::Method::OPTIONS, "http://localhost/a", HashMap::new(), None)
            .unwrap();
        let mut router = Router::new(req, config.clone());
        router.get("/a", &[], reply("a")).await;
        let response = router.resolve();
        assert_eq!(response.status, 204);
        assert_eq!(response.header("access-control-max-age"), Some("86400"));

        let req = Request::get("http://localhost/a").unwrap();
        let mut router = Router::new(req, config);
        router.get("/a", &[], reply("a")).await;
        let response = router.resolve();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }
}
