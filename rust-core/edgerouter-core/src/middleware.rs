//! # Middleware System
//!
//! Middlewares and terminal handlers share one contract: an async function
//! of the mutable request context and the session's [`Responder`]. A
//! middleware augments the request or resolves the session early; a
//! terminal handler produces the route's response.
//!
//! Closures are adapted with [`handler`] (or its alias [`middleware`]):
//!
//! ```
//! use edgerouter_core::middleware::handler;
//! use serde_json::json;
//!
//! let hello = handler(|_req, res| {
//!     Box::pin(async move {
//!         res.ok(&json!({ "hello": "world" }));
//!         Ok(())
//!     })
//! });
//! # let _ = hello;
//! ```

use crate::error::RouteError;
use crate::request::Request;
use crate::response::Responder;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

/// Boxed future returned by handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a middleware or handler; errors go to the error handler
pub type HandlerResult = std::result::Result<(), RouteError>;

/// Shared, type-erased middleware or handler
pub type BoxedHandler = Arc<dyn Handler>;

/// Middleware / route handler contract
pub trait Handler: Send + Sync {
    /// Run against the session's request and responder
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Responder) -> BoxFuture<'a, HandlerResult>;

    /// Name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Adapter turning a closure into a [`Handler`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Responder) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Responder) -> BoxFuture<'a, HandlerResult> {
        (self.f)(req, res)
    }

    fn name(&self) -> &'static str {
        "FnHandler"
    }
}

/// Wrap an async closure as a shareable handler
pub fn handler<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Request, &'a mut Responder) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler { f })
}

/// Same as [`handler`]; reads better at middleware call sites
pub fn middleware<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Request, &'a mut Responder) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    handler(f)
}

/// Ordered, short-circuiting middleware pipeline
///
/// Middlewares run one at a time in registration order. The chain stops
/// as soon as the session is resolved or a middleware fails.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<BoxedHandler>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Handler + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add an already shared middleware to the chain
    pub fn push(&mut self, middleware: BoxedHandler) {
        self.middlewares.push(middleware);
    }

    /// Run every middleware until one resolves the session or fails
    ///
    /// # Errors
    ///
    /// Returns the first middleware error; later middlewares do not run.
    pub async fn run(&self, req: &mut Request, res: &mut Responder) -> HandlerResult {
        for mw in &self.middlewares {
            if res.is_resolved() {
                debug!(middleware = mw.name(), "Session resolved, skipping rest of chain");
                return Ok(());
            }
            mw.call(req, res).await?;
        }
        Ok(())
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl From<&[BoxedHandler]> for MiddlewareChain {
    fn from(middlewares: &[BoxedHandler]) -> Self {
        Self {
            middlewares: middlewares.to_vec(),
        }
    }
}

/// Logging middleware - logs requests in structured form
///
/// Never resolves the session.
#[derive(Default)]
pub struct LoggingMiddleware {
    log_headers: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable header logging
    #[must_use]
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Handler for LoggingMiddleware {
    fn call<'a>(&'a self, req: &'a mut Request, _res: &'a mut Responder) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let request_id = req.header("x-request-id").unwrap_or("-");
            if self.log_headers {
                info!(
                    method = %req.method(),
                    path = %req.path(),
                    request_id = %request_id,
                    headers = ?req.headers(),
                    "Request received"
                );
            } else {
                info!(
                    method = %req.method(),
                    path = %req.path(),
                    request_id = %request_id,
                    "Request received"
                );
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}
