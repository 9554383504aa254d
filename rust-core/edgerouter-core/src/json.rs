//! # JSON Body Parsing
//!
//! Request bodies are parsed with simd-json. A body that is missing, empty
//! or malformed yields `None`: routes observe an absent parsed body, never
//! a parse error.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Parse a request body as JSON, swallowing failures
///
/// simd-json parses in place, so the bytes are copied into a scratch
/// buffer first.
#[must_use]
pub fn parse_body(body: Option<&[u8]>) -> Option<Value> {
    let body = body?;
    if body.is_empty() {
        return None;
    }

    let mut scratch = body.to_vec();
    match simd_json::from_slice::<Value>(&mut scratch) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Request body is not valid JSON, leaving it unparsed");
            None
        }
    }
}

/// Parse JSON bytes to a typed value using simd-json
///
/// # Errors
///
/// Returns `Error::Json` if the bytes are not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut scratch = bytes.to_vec();
    simd_json::from_slice(&mut scratch).or_else(|_| {
        // simd-json errors have no `Error` conversion; serde_json reports it
        serde_json::from_slice(bytes).map_err(Error::from)
    })
}

/// Serialize a value to JSON string
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        age: i32,
    }

    #[test]
    fn test_parse_body_object() {
        let body = br#"{"name": "John", "age": 30}"#;
        assert_eq!(
            parse_body(Some(body)),
            Some(json!({ "name": "John", "age": 30 }))
        );
    }

    #[test]
    fn test_parse_body_swallows_errors() {
        assert_eq!(parse_body(Some(b"not valid json")), None);
        assert_eq!(parse_body(Some(b"")), None);
        assert_eq!(parse_body(None), None);
    }

    #[test]
    fn test_parse_json_typed() {
        let data: TestData = parse_json(br#"{"name": "Jane", "age": 25}"#).unwrap();
        assert_eq!(data.name, "Jane");
    }

    #[test]
    fn test_parse_json_invalid() {
        let result: Result<TestData> = parse_json(b"{");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_to_json() {
        let data = TestData {
            name: "Bob".to_string(),
            age: 40,
        };
        let json = to_json(&data).unwrap();
        assert!(json.contains("Bob"));
        assert!(json.contains("40"));
    }
}
