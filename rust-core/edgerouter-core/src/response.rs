//! # HTTP Response
//!
//! [`Response`] is the value a session ends with. [`Responder`] is the
//! builder handed to middlewares and handlers: every outcome method writes
//! the session's single response slot and marks the session resolved.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

/// Content type for JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type for plain-text bodies
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
/// Content type for HTML bodies
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Final HTTP response of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Content type, absent for bodiless responses
    pub content_type: Option<String>,
    /// Response headers in insertion order (excluding Content-Type)
    pub headers: Vec<(String, String)>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            headers: Vec::new(),
        }
    }
}

impl Response {
    /// Create a JSON response from an already serialized body
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(CONTENT_TYPE_TEXT.to_string()),
            ..Self::default()
        }
    }

    /// Create an HTML response
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(CONTENT_TYPE_HTML.to_string()),
            ..Self::default()
        }
    }

    /// Create a response without body or content type
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            ..Self::default()
        }
    }

    /// Create a redirect response
    ///
    /// Statuses that are not redirects fall back to 302.
    #[must_use]
    pub fn redirect(location: &str, status: u16) -> Self {
        let status = match status {
            301 | 302 | 303 | 307 | 308 => status,
            _ => 302,
        };
        Self::empty(status).with_header("Location", location)
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_string());
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.headers.push((key.to_string(), value.to_string()));
    }

    /// Add a header, keeping existing values with the same name
    pub fn append_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_string());
        } else {
            self.headers.push((key.to_string(), value.to_string()));
        }
    }

    /// Get the first value of a header (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("content-type") {
            return self.content_type.as_deref();
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Convert to hyper Response
    #[must_use]
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder().status(status);
        if let Some(content_type) = &self.content_type {
            builder = builder.header("Content-Type", content_type.as_str());
        }
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|e| {
                error!(error = %e, "Response could not be converted, answering 500");
                let mut fallback = hyper::Response::new(Full::new(Bytes::from(
                    r#"{"error":"Internal Server Error"}"#,
                )));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

/// Body of error outcomes: `{"error": ..., "details": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// Error message
    pub error: String,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    /// Error body with a message only
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&str> for ErrorBody {
    fn from(error: &str) -> Self {
        Self::new(error)
    }
}

impl From<String> for ErrorBody {
    fn from(error: String) -> Self {
        Self::new(error)
    }
}

/// Response builder bound to one session
///
/// Holds the resolved flag and the single response slot. Each outcome
/// method replaces the slot and marks the session resolved; the router
/// stops calling user code once that happens.
#[derive(Debug, Default)]
pub struct Responder {
    resolved: bool,
    response: Option<Response>,
    deferred_headers: Vec<(String, String)>,
}

impl Responder {
    /// Create an unresolved responder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal response has been produced
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The response produced so far, if any
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub(crate) fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    pub(crate) fn take_deferred_headers(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.deferred_headers)
    }

    /// Register a header to be added to whatever response the session ends
    /// with (used by CORS)
    pub fn defer_header(&mut self, key: &str, value: &str) {
        self.deferred_headers
            .push((key.to_string(), value.to_string()));
    }

    /// Resolve with a prebuilt response
    pub fn send(&mut self, response: Response) {
        self.response = Some(response);
        self.resolved = true;
    }

    /// Resolve with a serialized JSON body
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T, status: u16) {
        match serde_json::to_string(data) {
            Ok(body) => self.send(Response::json(body).with_status(status)),
            Err(e) => {
                error!(error = %e, "Response body failed to serialize");
                self.send(
                    Response::json(r#"{"error":"Internal Server Error"}"#).with_status(500),
                );
            }
        }
    }

    /// Resolve with an HTML body
    pub fn html(&mut self, content: impl Into<String>, status: u16) {
        self.send(Response::html(content).with_status(status));
    }

    /// Resolve with a plain-text body
    pub fn text(&mut self, content: impl Into<String>, status: u16) {
        self.send(Response::text(content).with_status(status));
    }

    /// Resolve with a redirect (302 unless a redirect status is given)
    pub fn redirect(&mut self, location: &str, status: Option<u16>) {
        self.send(Response::redirect(location, status.unwrap_or(302)));
    }

    /// 200 with a JSON body
    pub fn ok<T: Serialize + ?Sized>(&mut self, data: &T) {
        self.json(data, 200);
    }

    /// 201 with a JSON body and an optional `Location`
    pub fn created<T: Serialize + ?Sized>(&mut self, data: &T, location: Option<&str>) {
        self.json(data, 201);
        if let (Some(location), Some(response)) = (location, self.response.as_mut()) {
            response.set_header("Location", location);
        }
    }

    /// 202 with a JSON body, `{"message":"Accepted"}` by default
    pub fn accepted(&mut self, data: Option<Value>) {
        let body = data.unwrap_or_else(|| json!({ "message": "Accepted" }));
        self.json(&body, 202);
    }

    /// 204 without body
    pub fn no_content(&mut self) {
        self.send(Response::empty(204));
    }

    /// 400 with `{"error": ...}`
    pub fn bad_request(&mut self, error: impl Into<ErrorBody>) {
        self.json(&error.into(), 400);
    }

    /// 401 with `{"error": ...}`
    pub fn unauthorized(&mut self, error: Option<&str>) {
        self.json(&ErrorBody::new(error.unwrap_or("Unauthorized")), 401);
    }

    /// 403 with `{"error": ...}`
    pub fn forbidden(&mut self, error: Option<&str>) {
        self.json(&ErrorBody::new(error.unwrap_or("Forbidden")), 403);
    }

    /// 404 with `{"error": ...}`
    pub fn not_found(&mut self, error: Option<&str>) {
        self.json(&ErrorBody::new(error.unwrap_or("Not Found")), 404);
    }

    /// 409 with `{"error": ...}`
    pub fn conflict(&mut self, error: impl Into<ErrorBody>) {
        self.json(&error.into(), 409);
    }

    /// 422 with `{"error": "Validation failed", "issues": ...}`
    pub fn unprocessable<T: Serialize + ?Sized>(&mut self, issues: &T) {
        let body = json!({
            "error": "Validation failed",
            "issues": issues,
        });
        self.json(&body, 422);
    }

    /// 500 with `{"error": ...}`
    pub fn server_error(&mut self, error: Option<&str>) {
        self.json(&ErrorBody::new(error.unwrap_or("Internal Server Error")), 500);
    }
}
