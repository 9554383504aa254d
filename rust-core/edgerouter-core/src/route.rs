//! # Route Patterns
//!
//! Compiles `:name` route patterns into matchers and extracts path
//! parameters from concrete request paths.
//!
//! ## Matching rules
//!
//! - A pattern without `:` segments matches only the identical path string
//!   (no trailing-slash normalization, no case folding)
//! - A parameter name is the run of word characters (`[A-Za-z0-9_]`) after
//!   `:`; anything after the name is literal text in the same segment, so
//!   `/f/:name.json` captures `report` from `/f/report.json`
//! - Every capture is non-empty and never spans a `/`
//! - Segment counts must agree; there is no wildcard or partial-depth match
//! - Captured values are percent-decoded; a value that cannot be decoded
//!   makes the whole match fail
//!
//! Parameterized patterns are translated to `matchit` syntax
//! (`/users/:id` becomes `/users/{id}`) and matched by a single-route
//! radix tree. A segment that mixes parameters with literal text is
//! captured whole by the tree and then split by a per-segment regex.

use crate::error::{Error, Result};
use matchit::Router as MatchitRouter;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Ordered path parameters, in the order they appear in the pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Create an empty parameter list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a decoded parameter by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(name, value)` pairs left to right
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of captured parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON object (used by schema validation)
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

enum SegmentCapture {
    Whole(String),
    Mixed { regex: Regex, names: Vec<String> },
}

enum MatcherKind {
    Exact,
    Parameterized {
        router: MatchitRouter<()>,
        /// Tree parameter key and how to read it, left to right
        captures: Vec<(String, SegmentCapture)>,
        names: Vec<String>,
    },
}

enum Piece<'a> {
    Literal(&'a str),
    Param(&'a str),
}

const fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split one pattern segment into literal text and parameter names
fn split_segment(segment: &str) -> std::result::Result<Vec<Piece<'_>>, String> {
    let mut pieces = Vec::new();
    let mut rest = segment;
    while let Some(colon) = rest.find(':') {
        if colon > 0 {
            pieces.push(Piece::Literal(&rest[..colon]));
        }
        let after = &rest[colon + 1..];
        let end = after.find(|c: char| !is_word(c)).unwrap_or(after.len());
        if end == 0 {
            return Err("empty parameter name".to_string());
        }
        pieces.push(Piece::Param(&after[..end]));
        rest = &after[end..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    Ok(pieces)
}

/// A compiled route pattern
///
/// Immutable after construction; the router memoizes one per distinct
/// pattern string for the lifetime of a session.
pub struct RouteMatcher {
    pattern: String,
    kind: MatcherKind,
}

impl std::fmt::Debug for RouteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatcher")
            .field("pattern", &self.pattern)
            .field("param_names", &self.param_names())
            .finish()
    }
}

impl RouteMatcher {
    /// Compile a route pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for empty or duplicated
    /// parameter names (a `:` not followed by a word character counts as
    /// empty) and for patterns the radix tree rejects.
    pub fn compile(pattern: &str) -> Result<Self> {
        if !pattern.contains(':') {
            return Ok(Self {
                pattern: pattern.to_string(),
                kind: MatcherKind::Exact,
            });
        }

        let invalid = |reason: String| Error::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut names: Vec<String> = Vec::new();
        let mut captures = Vec::new();
        let mut segments = Vec::new();

        for (index, segment) in pattern.split('/').enumerate() {
            let pieces = split_segment(segment).map_err(invalid)?;
            let mut segment_names = Vec::new();
            for piece in &pieces {
                if let Piece::Param(name) = piece {
                    if names.iter().any(|n| n == name) {
                        return Err(invalid(format!("duplicate parameter '{name}'")));
                    }
                    names.push((*name).to_string());
                    segment_names.push((*name).to_string());
                }
            }

            match pieces.as_slice() {
                [] | [Piece::Literal(_)] => {
                    segments.push(segment.replace('{', "{{").replace('}', "}}"));
                }
                [Piece::Param(name)] => {
                    segments.push(format!("{{{name}}}"));
                    let name = (*name).to_string();
                    captures.push((name.clone(), SegmentCapture::Whole(name)));
                }
                _ => {
                    let mut source = String::from("^");
                    for piece in &pieces {
                        match piece {
                            Piece::Literal(text) => source.push_str(&regex::escape(text)),
                            Piece::Param(_) => source.push_str("([^/]+)"),
                        }
                    }
                    source.push('$');
                    let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
                    // `-` is never a word character, so this key cannot clash with a name
                    let key = format!("segment-{index}");
                    segments.push(format!("{{{key}}}"));
                    captures.push((
                        key,
                        SegmentCapture::Mixed {
                            regex,
                            names: segment_names,
                        },
                    ));
                }
            }
        }

        let mut router = MatchitRouter::new();
        router
            .insert(segments.join("/"), ())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            kind: MatcherKind::Parameterized {
                router,
                captures,
                names,
            },
        })
    }

    /// The raw pattern this matcher was compiled from
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parameter names, left to right
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        match &self.kind {
            MatcherKind::Exact => &[],
            MatcherKind::Parameterized { names, .. } => names,
        }
    }

    /// Test a concrete path
    ///
    /// Returns the decoded parameters on a match, `None` otherwise.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let MatcherKind::Parameterized {
            router, captures, ..
        } = &self.kind
        else {
            return (path == self.pattern).then(Params::new);
        };

        let matched = router.at(path).ok()?;
        let mut params = Params::new();
        for (key, capture) in captures {
            let raw = matched.params.get(key)?;
            if raw.is_empty() {
                return None;
            }
            match capture {
                SegmentCapture::Whole(name) => params.push(name.clone(), percent_decode(raw)?),
                SegmentCapture::Mixed { regex, names } => {
                    let groups = regex.captures(raw)?;
                    for (i, name) in names.iter().enumerate() {
                        let value = groups.get(i + 1)?.as_str();
                        params.push(name.clone(), percent_decode(value)?);
                    }
                }
            }
        }
        Some(params)
    }
}

/// Strict percent-decoding of a single path segment
///
/// Fails on truncated or non-hex escapes and on byte sequences that are not
/// UTF-8. `+` is left untouched.
#[must_use]
pub fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}
