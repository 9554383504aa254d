//! # Query Decoding
//!
//! Turns a literal query string into typed JSON values.
//!
//! - `true` / `false` become booleans
//! - whole integers become numbers
//! - `[a,b,c]` becomes an array whose items are coerced the same way
//! - quote escapes (`%27`, `%22`) and surrounding quotes are stripped
//! - everything else is a percent-decoded string
//!
//! The decoder is pure and never fails: malformed escapes are kept as-is.

use serde_json::{Map, Number, Value};

/// Decode a raw query string (without the leading `?`)
///
/// Returns `None` when there is no query at all, mirroring a request whose
/// URL carries no search part.
#[must_use]
pub fn decode_query(query: Option<&str>) -> Option<Map<String, Value>> {
    let query = query?.trim_start_matches('?');
    if query.is_empty() {
        return None;
    }

    let normalized = query
        .replace("%5B", "[")
        .replace("%5b", "[")
        .replace("%5D", "]")
        .replace("%5d", "]")
        .replace("%20", " ");

    let mut queries = Map::new();
    for pair in normalized.split('&').filter(|p| !p.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        queries.insert(url_decode(key), coerce(raw));
    }
    Some(queries)
}

fn coerce(raw: &str) -> Value {
    if let Some(scalar) = coerce_literal(raw) {
        return scalar;
    }

    if raw.contains('[') && raw.contains(']') {
        let inner = raw.replacen('[', "", 1).replacen(']', "", 1);
        let items = inner
            .split(',')
            .map(|item| coerce_literal(item).unwrap_or_else(|| Value::String(unquote(item))))
            .collect();
        return Value::Array(items);
    }

    Value::String(unquote(raw))
}

fn coerce_literal(raw: &str) -> Option<Value> {
    match raw {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => raw
            .parse::<i64>()
            .ok()
            .map(|n| Value::Number(Number::from(n))),
    }
}

fn unquote(raw: &str) -> String {
    let stripped = raw.replace("%27", "").replace("%22", "");
    let decoded = url_decode(&stripped);

    let bytes = decoded.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return decoded[1..decoded.len() - 1].to_string();
        }
    }
    decoded
}

/// Lenient URL decoding
///
/// `+` becomes a space and valid `%XX` escapes are decoded; anything
/// malformed is copied through unchanged.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = decoded {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_mixed_literals() {
        let queries = decode_query(Some(
            "slug=first-post&comments=false&likes=true&releated=[1,true,comments]",
        ))
        .unwrap();

        assert_eq!(
            Value::Object(queries),
            json!({
                "slug": "first-post",
                "comments": false,
                "likes": true,
                "releated": [1, true, "comments"],
            })
        );
    }

    #[test]
    fn test_decode_absent_query() {
        assert!(decode_query(None).is_none());
        assert!(decode_query(Some("")).is_none());
        assert!(decode_query(Some("?")).is_none());
    }

    #[test]
    fn test_decode_leading_question_mark() {
        let queries = decode_query(Some("?page=2")).unwrap();
        assert_eq!(queries.get("page"), Some(&json!(2)));
    }

    #[test]
    fn test_decode_encoded_brackets() {
        let queries = decode_query(Some("ids=%5B1,2,3%5D")).unwrap();
        assert_eq!(queries.get("ids"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_decode_quoted_strings() {
        let queries = decode_query(Some("name=%22John%20Doe%22&city=%27Recife%27")).unwrap();
        assert_eq!(queries.get("name"), Some(&json!("John Doe")));
        assert_eq!(queries.get("city"), Some(&json!("Recife")));
    }

    #[test]
    fn test_decode_negative_and_non_integer_numbers() {
        let queries = decode_query(Some("offset=-10&ratio=1.5&date=2024-01-01")).unwrap();
        assert_eq!(queries.get("offset"), Some(&json!(-10)));
        assert_eq!(queries.get("ratio"), Some(&json!("1.5")));
        assert_eq!(queries.get("date"), Some(&json!("2024-01-01")));
    }

    #[test]
    fn test_decode_key_without_value() {
        let queries = decode_query(Some("flag&x=1&")).unwrap();
        assert_eq!(queries.get("flag"), Some(&json!("")));
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("100%25"), "100%");
        assert_eq!(url_decode("100%"), "100%");
    }
}
