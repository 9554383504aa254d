//! # Error Handling
//!
//! Centralized error types for edgerouter.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Two families live here:
//!
//! - [`Error`] - failures of the crate's own fallible operations
//!   (pattern compilation, body collection, URI handling)
//! - [`RouteError`] - what user middlewares and handlers return; always
//!   caught by the router and turned into a response

use thiserror::Error;

/// Result type alias for edgerouter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the edgerouter runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Request URI could not be turned into an absolute URL
    #[error("Invalid request URI {uri}: {reason}")]
    InvalidUri {
        /// The offending URI
        uri: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Reading the inbound body failed
    #[error("Failed to read request body: {0}")]
    Body(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

/// Error raised by a middleware, a route handler or an error handler.
///
/// The router never lets one of these escape a registration call: it is
/// routed to the registered error handler, or rendered by the default one
/// as `{"error": message}` with [`RouteError::status_code`].
#[derive(Error, Debug)]
pub enum RouteError {
    /// Error carrying an explicit HTTP status
    #[error("{message}")]
    Http {
        /// HTTP status code to answer with
        status: u16,
        /// Human-readable message
        message: String,
    },

    /// JSON failure inside user code
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Anything else; answered with a 500
    #[error("{0}")]
    Other(String),
}

/// Status used when an error carries none.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Message used when an error carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "Internal Server Error";

impl RouteError {
    /// Create an error with an explicit status
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a status-less error (rendered as 500)
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// 403 Forbidden
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 409 Conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// HTTP status the default error handler answers with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Http { status, .. } if (100..=599).contains(status) => *status,
            _ => DEFAULT_ERROR_STATUS,
        }
    }

    /// Message the default error handler puts in the body
    #[must_use]
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

impl From<Error> for RouteError {
    fn from(err: Error) -> Self {
        match err {
            Error::PayloadTooLarge { .. } => Self::new(413, err.to_string()),
            Error::InvalidUri { .. } => Self::bad_request(err.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}
