//! # CORS
//!
//! Cross-Origin Resource Sharing headers for sessions.
//!
//! `OPTIONS` requests are answered directly with a 204 preflight. For every
//! other request the CORS headers are deferred and added to whatever
//! response the session resolves with.

use crate::config::CorsConfig;
use crate::middleware::{BoxFuture, Handler, HandlerResult};
use crate::request::Request;
use crate::response::{Responder, Response};
use hyper::Method;
use tracing::debug;

/// CORS middleware, usable with `Router::use_middleware`
#[derive(Debug, Clone, Default)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    /// Create a CORS middleware from a policy
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// The policy this middleware applies
    #[must_use]
    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    /// Build the 204 answer to a preflight request
    #[must_use]
    pub fn preflight(&self, request_origin: &str) -> Response {
        let mut response = Response::empty(204);
        if let Some(origin) = self.config.origin.resolve(request_origin) {
            response.set_header("Access-Control-Allow-Origin", &origin);
        }
        response.set_header("Access-Control-Allow-Methods", &self.config.methods.join(", "));
        response.set_header(
            "Access-Control-Allow-Headers",
            &self.config.allowed_headers.join(", "),
        );
        response.set_header("Access-Control-Max-Age", &self.config.max_age.to_string());
        if self.config.credentials {
            response.set_header("Access-Control-Allow-Credentials", "true");
        }
        response
    }

    /// Headers added to a non-preflight response
    #[must_use]
    pub fn response_headers(&self, request_origin: &str) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(origin) = self.config.origin.resolve(request_origin) {
            headers.push(("Access-Control-Allow-Origin".to_string(), origin));
        }
        if self.config.credentials {
            headers.push((
                "Access-Control-Allow-Credentials".to_string(),
                "true".to_string(),
            ));
        }
        if !self.config.exposed_headers.is_empty() {
            headers.push((
                "Access-Control-Expose-Headers".to_string(),
                self.config.exposed_headers.join(", "),
            ));
        }
        headers
    }

    /// Answer an unresolved preflight, otherwise defer the response headers
    pub(crate) fn apply(&self, req: &Request, res: &mut Responder) {
        let origin = req.header("origin").unwrap_or("");
        if req.method() == Method::OPTIONS && !res.is_resolved() {
            debug!(origin = %origin, "Answering CORS preflight");
            res.send(self.preflight(origin));
            return;
        }
        for (name, value) in self.response_headers(origin) {
            res.defer_header(&name, &value);
        }
    }
}

impl Handler for CorsMiddleware {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Responder) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            self.apply(req, res);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "CorsMiddleware"
    }
}
