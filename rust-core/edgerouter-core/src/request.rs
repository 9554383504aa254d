//! # HTTP Request
//!
//! The typed request context shared by every middleware and handler of a
//! session.
//!
//! The inbound parts (method, absolute URL, headers, raw body) are fixed at
//! construction. The augmentation fields are filled in as the session runs:
//!
//! - `params` - decoded path parameters of the matched pattern
//! - `queries` - decoded query string (GET routes)
//! - `body_json` - parsed JSON body (POST/PUT routes), `None` when the body
//!   is absent or malformed
//! - `metadata` - anything middlewares want to pass along

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::route::Params;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, HOST};
use hyper::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Request context for one session
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
    /// Decoded path parameters of the matched route
    pub params: Params,
    /// Decoded query values, `None` when the URL has no query
    pub queries: Option<Map<String, Value>>,
    /// Parsed JSON body, `None` when absent or unparsable
    pub body_json: Option<Value>,
    /// Arbitrary data attached by middlewares
    pub metadata: Metadata,
}

impl Request {
    /// Create a request from an absolute URL
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUri` if the URL does not parse or lacks a
    /// scheme or host.
    pub fn new(
        method: Method,
        url: &str,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Result<Self> {
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| Error::InvalidUri {
            uri: url.to_string(),
            reason: e.to_string(),
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(Error::InvalidUri {
                uri: url.to_string(),
                reason: "URL must be absolute".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Ok(Self::from_parts(method, uri, headers, body))
    }

    /// Shorthand for a bodiless request without headers
    ///
    /// # Errors
    ///
    /// Same as [`Request::new`].
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url, HashMap::new(), None)
    }

    /// Create from a hyper request, collecting the body
    ///
    /// # Errors
    ///
    /// See [`Request::from_hyper_with_limit`].
    pub async fn from_hyper<B>(req: hyper::Request<B>) -> Result<Self>
    where
        B: Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        Self::from_hyper_with_limit(req, usize::MAX).await
    }

    /// Create from a hyper request with body size limit
    ///
    /// Origin-form targets (`/path?query`) are made absolute using the
    /// `Host` header.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` when the declared or actual body
    /// size exceeds `max_body_size`, `Error::Body` when the body stream
    /// fails, and `Error::InvalidUri` when no absolute URL can be built.
    pub async fn from_hyper_with_limit<B>(
        req: hyper::Request<B>,
        max_body_size: usize,
    ) -> Result<Self>
    where
        B: Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();

        if let Some(content_len) = parts
            .headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok())
        {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: content_len,
                });
            }
        }

        let uri = absolute_uri(&parts.uri, &parts.headers)?;

        let bytes = body
            .collect()
            .await
            .map_err(|e| Error::Body(e.to_string()))?
            .to_bytes();
        if bytes.len() > max_body_size {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual: bytes.len(),
            });
        }
        let body = if bytes.is_empty() { None } else { Some(bytes) };

        Ok(Self::from_parts(parts.method, uri, parts.headers, body))
    }

    fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Option<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            params: Params::new(),
            queries: None,
            body_json: None,
            metadata: Metadata::new(),
        }
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL as a string
    #[must_use]
    pub fn url(&self) -> String {
        self.uri.to_string()
    }

    /// Request URI
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path (without query string)
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string, without the leading `?`
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Get the request body as string (UTF-8)
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Look up a decoded query value
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Value> {
        self.queries.as_ref().and_then(|q| q.get(name))
    }

    /// Look up a decoded path parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

fn absolute_uri(uri: &Uri, headers: &HeaderMap) -> Result<Uri> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Ok(uri.clone());
    }

    let invalid = |reason: &str| Error::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| invalid("origin-form target without Host header"))?;
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    Uri::builder()
        .scheme("http")
        .authority(host)
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[test]
    fn test_request_new() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        let req = Request::new(
            Method::POST,
            "https://example.com/users/1?page=2",
            headers,
            Some(Bytes::from_static(b"{}")),
        )
        .unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/users/1");
        assert_eq!(req.query_string(), Some("page=2"));
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.body_str(), Some("{}"));
        assert!(req.params.is_empty());
        assert!(req.queries.is_none());
    }

    #[test]
    fn test_request_requires_absolute_url() {
        assert!(matches!(
            Request::get("/relative"),
            Err(Error::InvalidUri { .. })
        ));
    }

    #[test]
    fn test_request_url_round_trip() {
        let req = Request::get("http://localhost/data").unwrap();
        assert_eq!(req.url(), "http://localhost/data");
    }

    #[tokio::test]
    async fn test_from_hyper_origin_form() {
        let req = hyper::Request::builder()
            .method("PUT")
            .uri("/items/3?x=1")
            .header("host", "api.local")
            .body(Full::new(Bytes::from_static(br#"{"a":1}"#)))
            .unwrap();

        let req = Request::from_hyper(req).await.unwrap();
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.url(), "http://api.local/items/3?x=1");
        assert_eq!(req.body_str(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_from_hyper_payload_too_large() {
        let req = hyper::Request::builder()
            .uri("http://api.local/upload")
            .body(Full::new(Bytes::from_static(b"0123456789")))
            .unwrap();

        let result = Request::from_hyper_with_limit(req, 4).await;
        assert!(matches!(
            result,
            Err(Error::PayloadTooLarge { limit: 4, actual: 10 })
        ));
    }

    #[tokio::test]
    async fn test_from_hyper_without_host() {
        let req = hyper::Request::builder()
            .uri("/nowhere")
            .body(Full::new(Bytes::new()))
            .unwrap();

        assert!(matches!(
            Request::from_hyper(req).await,
            Err(Error::InvalidUri { .. })
        ));
    }
}
