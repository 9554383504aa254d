//! # Validation Module
//!
//! Schema validation for request bodies, path parameters and queries, plus
//! the structured errors it produces.
//!
//! Validation never fails with an `Err`: checking a value against a schema
//! always yields a (possibly empty) ordered list of field errors. The
//! [`validate`] middleware turns a non-empty list into a 400 response.
//!
//! ```
//! use edgerouter_core::validation::{Rule, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .field("name", Rule::string().required().min_length(3))
//!     .field("age", Rule::number().min(18.0));
//!
//! let errors = schema.validate(&json!({ "name": "Al", "age": 17 }));
//! assert_eq!(errors.len(), 2);
//! ```

use crate::middleware::{BoxFuture, BoxedHandler, Handler, HandlerResult};
use crate::request::Request;
use crate::response::Responder;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Value is invalid type
    InvalidType,
    /// Value is not an email address
    InvalidEmail,
    /// Value is not an absolute URL
    InvalidUrl,
    /// Value is not a UUID
    InvalidUuid,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value is below minimum
    TooSmall,
    /// Value is above maximum
    TooLarge,
    /// Value doesn't match pattern
    InvalidPattern,
    /// Value is not in allowed set
    InvalidEnum,
    /// Custom validation failed
    #[serde(rename = "custom_validation")]
    Custom,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name (e.g., "email")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} is required"),
            field: field_str,
            code: ValidationCode::Required,
        }
    }

    /// Create an "invalid type" error
    pub fn invalid_type(field: impl Into<String>, expected: &str) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} must be {expected}"),
            field: field_str,
            code: ValidationCode::InvalidType,
        }
    }
}

/// Collection of validation errors
///
/// Preserves schema order so clients see errors in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Append all errors of another collection
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }

    /// Group errors by field
    #[must_use]
    pub fn by_field(&self) -> HashMap<String, Vec<&FieldError>> {
        let mut map: HashMap<String, Vec<&FieldError>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.field.clone()).or_default().push(error);
        }
        map
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;

/// Expected type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON number, or a string that parses as one
    Number,
    /// JSON boolean, or `"true"` / `"false"`
    Boolean,
    /// String shaped like an email address
    Email,
    /// String holding an absolute URL
    Url,
    /// String holding a UUID
    Uuid,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

/// Custom check: `Ok(())` passes, `Err(Some(msg))` fails with `msg`,
/// `Err(None)` fails with the rule's default message
pub type CustomCheck = Arc<dyn Fn(&Value) -> Result<(), Option<String>> + Send + Sync>;

/// Validation rule for one field
///
/// Checks run in a fixed order (required, type, range, length, pattern,
/// enum, custom) and the first failure is reported.
#[derive(Clone, Default)]
pub struct Rule {
    kind: Option<FieldType>,
    required: bool,
    min: Option<f64>,
    max: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    allowed: Option<Vec<Value>>,
    custom: Option<CustomCheck>,
    message: Option<String>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("allowed", &self.allowed)
            .field("custom", &self.custom.is_some())
            .field("message", &self.message)
            .finish()
    }
}

impl Rule {
    /// Rule without a type constraint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule for a given type
    #[must_use]
    pub fn of(kind: FieldType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// String rule
    #[must_use]
    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    /// Number rule
    #[must_use]
    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    /// Boolean rule
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    /// Email rule
    #[must_use]
    pub fn email() -> Self {
        Self::of(FieldType::Email)
    }

    /// URL rule
    #[must_use]
    pub fn url() -> Self {
        Self::of(FieldType::Url)
    }

    /// UUID rule
    #[must_use]
    pub fn uuid() -> Self {
        Self::of(FieldType::Uuid)
    }

    /// Array rule
    #[must_use]
    pub fn array() -> Self {
        Self::of(FieldType::Array)
    }

    /// Object rule
    #[must_use]
    pub fn object() -> Self {
        Self::of(FieldType::Object)
    }

    /// Reject absent, null and empty-string values
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Minimum numeric value
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Maximum numeric value
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Minimum string length (characters) or array length
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Maximum string length (characters) or array length
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Regex strings must match
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Allowed values
    #[must_use]
    pub fn one_of<I: IntoIterator<Item = Value>>(mut self, values: I) -> Self {
        self.allowed = Some(values.into_iter().collect());
        self
    }

    /// Custom check
    #[must_use]
    pub fn custom<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), Option<String>> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(check));
        self
    }

    /// Message replacing every default message of this rule
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check one value; `None` when it passes
    #[must_use]
    pub fn check(&self, field: &str, value: Option<&Value>) -> Option<FieldError> {
        let fail = |default: String, code: ValidationCode| {
            Some(FieldError::new(
                field,
                self.message.clone().unwrap_or(default),
                code,
            ))
        };

        let is_blank = matches!(value, None | Some(Value::Null))
            || matches!(value, Some(Value::String(s)) if s.is_empty());
        if self.required && is_blank {
            return fail(format!("{field} is required"), ValidationCode::Required);
        }

        let value = match value {
            None | Some(Value::Null) => return None,
            Some(v) => v,
        };

        let value = match self.check_type(value) {
            Ok(coerced) => coerced,
            Err((expected, code)) => return fail(format!("{field} must be {expected}"), code),
        };

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min.filter(|min| n < *min) {
                return fail(format!("{field} must be at least {min}"), ValidationCode::TooSmall);
            }
            if let Some(max) = self.max.filter(|max| n > *max) {
                return fail(format!("{field} must be at most {max}"), ValidationCode::TooLarge);
            }
        }

        let length = match &value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = length {
            if let Some(min) = self.min_length.filter(|min| len < *min) {
                return fail(
                    format!("{field} must have at least {min} characters"),
                    ValidationCode::TooShort,
                );
            }
            if let Some(max) = self.max_length.filter(|max| len > *max) {
                return fail(
                    format!("{field} must have at most {max} characters"),
                    ValidationCode::TooLong,
                );
            }
        }

        if let (Value::String(s), Some(pattern)) = (&value, &self.pattern) {
            if !pattern.is_match(s) {
                return fail(
                    format!("{field} does not match required pattern"),
                    ValidationCode::InvalidPattern,
                );
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|candidate| values_equal(candidate, &value)) {
                let listed: Vec<String> = allowed.iter().map(display_value).collect();
                return fail(
                    format!("{field} must be one of: {}", listed.join(", ")),
                    ValidationCode::InvalidEnum,
                );
            }
        }

        if let Some(custom) = &self.custom {
            if let Err(message) = custom(&value) {
                let message = message
                    .or_else(|| self.message.clone())
                    .unwrap_or_else(|| format!("{field} failed custom validation"));
                return Some(FieldError::new(field, message, ValidationCode::Custom));
            }
        }

        None
    }

    /// Type check with coercion; on failure returns the expected-type
    /// phrase and the error code
    fn check_type(&self, value: &Value) -> Result<Value, (&'static str, ValidationCode)> {
        let Some(kind) = self.kind else {
            return Ok(value.clone());
        };

        let ok = match kind {
            FieldType::String => value.is_string(),
            FieldType::Number => {
                return match value {
                    Value::Number(_) => Ok(value.clone()),
                    Value::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .map(|n| json!(n))
                        .ok_or(("a number", ValidationCode::InvalidType)),
                    _ => Err(("a number", ValidationCode::InvalidType)),
                };
            }
            FieldType::Boolean => {
                return match value {
                    Value::Bool(_) => Ok(value.clone()),
                    Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                    Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                    _ => Err(("a boolean", ValidationCode::InvalidType)),
                };
            }
            FieldType::Email => {
                if !regex_matches(email_regex(), value) {
                    return Err(("a valid email", ValidationCode::InvalidEmail));
                }
                true
            }
            FieldType::Url => {
                let Some(s) = value.as_str() else {
                    return Err(("a string", ValidationCode::InvalidType));
                };
                if !is_absolute_url(s) {
                    return Err(("a valid URL", ValidationCode::InvalidUrl));
                }
                true
            }
            FieldType::Uuid => {
                if !regex_matches(uuid_regex(), value) {
                    return Err(("a valid UUID", ValidationCode::InvalidUuid));
                }
                true
            }
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        };

        if ok {
            Ok(value.clone())
        } else {
            let expected = match kind {
                FieldType::Array => "an array",
                FieldType::Object => "an object",
                _ => "a string",
            };
            Err((expected, ValidationCode::InvalidType))
        }
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn uuid_regex() -> Option<&'static Regex> {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    UUID.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").ok()
    })
    .as_ref()
}

fn regex_matches(regex: Option<&Regex>, value: &Value) -> bool {
    match (regex, value.as_str()) {
        (Some(regex), Some(s)) => regex.is_match(s),
        _ => false,
    }
}

fn is_absolute_url(s: &str) -> bool {
    s.parse::<hyper::Uri>()
        .map(|uri| uri.scheme().is_some() && uri.authority().is_some())
        .unwrap_or(false)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered mapping from field name to rule
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Rule)>,
}

impl Schema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field rule
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    /// Validate an object; non-object data is treated as having no fields
    #[must_use]
    pub fn validate(&self, data: &Value) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (name, rule) in &self.fields {
            if let Some(error) = rule.check(name, data.get(name.as_str())) {
                errors.add(error);
            }
        }
        errors
    }

    /// Validate and return the data back when it passes
    ///
    /// # Errors
    ///
    /// Returns the collected field errors when any rule fails.
    pub fn check<'v>(&self, data: &'v Value) -> ValidationResult<&'v Value> {
        let errors = self.validate(data);
        if errors.is_empty() {
            Ok(data)
        } else {
            Err(errors)
        }
    }
}

/// Preset rules
pub mod schemas {
    use super::{Rule, Schema};

    /// Required UUID
    #[must_use]
    pub fn uuid() -> Rule {
        Rule::uuid().required()
    }

    /// Required email
    #[must_use]
    pub fn email() -> Rule {
        Rule::email().required()
    }

    /// Required URL
    #[must_use]
    pub fn url() -> Rule {
        Rule::url().required()
    }

    /// `page >= 1`, `1 <= limit <= 100`
    #[must_use]
    pub fn pagination() -> Schema {
        Schema::new()
            .field("page", Rule::number().min(1.0))
            .field("limit", Rule::number().min(1.0).max(100.0))
    }
}

/// Callback taking over the failure response
pub type ValidationErrorHandler =
    Arc<dyn Fn(&ValidationErrors, &mut Request, &mut Responder) + Send + Sync>;

/// What the [`validate`] middleware checks
#[derive(Clone, Default)]
pub struct ValidateConfig {
    /// Schema for the parsed JSON body
    pub body: Option<Schema>,
    /// Schema for decoded path parameters
    pub params: Option<Schema>,
    /// Schema for decoded queries
    pub queries: Option<Schema>,
    /// Custom failure response
    pub on_error: Option<ValidationErrorHandler>,
}

impl ValidateConfig {
    /// Empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the JSON body
    #[must_use]
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    /// Validate path parameters
    #[must_use]
    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    /// Validate queries
    #[must_use]
    pub fn queries(mut self, schema: Schema) -> Self {
        self.queries = Some(schema);
        self
    }

    /// Replace the default 400 response
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ValidationErrors, &mut Request, &mut Responder) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

struct ValidateMiddleware {
    config: ValidateConfig,
}

impl ValidateMiddleware {
    fn collect(&self, req: &Request) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if let (Some(schema), Some(body)) = (&self.config.body, &req.body_json) {
            errors.extend(schema.validate(body));
        }
        if let Some(schema) = &self.config.params {
            if !req.params.is_empty() {
                errors.extend(schema.validate(&req.params.to_json()));
            }
        }
        if let (Some(schema), Some(queries)) = (&self.config.queries, &req.queries) {
            errors.extend(schema.validate(&Value::Object(queries.clone())));
        }

        errors
    }
}

impl Handler for ValidateMiddleware {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Responder) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let errors = self.collect(req);
            if errors.is_empty() {
                return Ok(());
            }

            match &self.config.on_error {
                Some(on_error) => on_error(&errors, req, res),
                None => res.json(
                    &json!({
                        "error": "Validation failed",
                        "issues": errors.errors,
                    }),
                    400,
                ),
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "ValidateMiddleware"
    }
}

/// Middleware validating the request against schemas
///
/// Body rules apply only when a JSON body was parsed, param rules only when
/// the route captured parameters, query rules only when a query was decoded.
#[must_use]
pub fn validate(config: ValidateConfig) -> BoxedHandler {
    Arc::new(ValidateMiddleware { config })
}
