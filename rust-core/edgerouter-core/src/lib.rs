//! # edgerouter Core
//!
//! Per-request HTTP router for edge functions.
//! Builds one routing session per inbound request, runs the first matching
//! route's middleware chain and handler, and resolves exactly one response.
//!
//! ## Architecture
//!
//! A [`Router`] owns the request context and the single response slot of
//! one session. Routes are declared in program order against it; the first
//! match wins and every later declaration is a no-op. Caching, CORS and
//! validation layer on top without ever producing a second response.
//!
//! ## Modules
//!
//! - `router` - Session router: dispatch, error handling, resolution
//! - `route` - Route pattern matching (`/users/:id`) using matchit
//! - `group` - Route groups with shared prefixes and middlewares
//! - `request` - Typed request context and hyper conversion
//! - `response` - Response value and the [`Responder`] outcome builder
//! - `middleware` - Handler contract and middleware chains
//! - `query` - Query string decoding with type coercion
//! - `json` - High-performance JSON parsing with simd-json
//! - `cache` - Read-through cache policy and cache store contract
//! - `cors` - CORS preflight and response headers
//! - `validation` - Schema validation and structured errors
//! - `metadata` - Typed session-scoped metadata
//! - `config` - Session configuration
//! - `telemetry` - Tracing subscriber bootstrap
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod cors;
pub mod error;
pub mod group;
pub mod json;
pub mod metadata;
pub mod middleware;
pub mod query;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod telemetry;
pub mod validation;

pub use cache::{CacheKey, CachePolicy, CacheStore, MemoryCache};
pub use config::{AllowedOrigins, CacheConfig, CorsConfig, RouterConfig};
pub use cors::CorsMiddleware;
pub use error::{Error, Result, RouteError};
pub use group::{GroupConfig, RouteGroup};
pub use json::{parse_json, to_json};
pub use metadata::Metadata;
pub use middleware::{
    handler, middleware, BoxFuture, BoxedHandler, Handler, HandlerResult, LoggingMiddleware,
    MiddlewareChain,
};
pub use query::decode_query;
pub use request::Request;
pub use response::{ErrorBody, Responder, Response};
pub use route::{Params, RouteMatcher};
pub use router::{error_handler, ErrorHandler, Method, Router};
pub use telemetry::init_tracing;
pub use validation::{
    validate, FieldError, FieldType, Rule, Schema, ValidateConfig, ValidationCode,
    ValidationErrors, ValidationResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
