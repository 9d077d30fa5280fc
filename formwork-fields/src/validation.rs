//! Validation results and the declarative rules every field shares.
//!
//! The default pipeline is: `required` first, then each declared rule
//! (`min`, `max`, `pattern`, `email`, `url`) on its own. Errors accumulate so
//! a user sees every problem in one pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::base::FieldBase;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps", "mailto"];

const RELATIVE_BASE: &str = "http://localhost/";

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Build a result from a list of errors; empty means valid.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Record an error.
    pub fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.valid = false;
    }

    /// Append every error of another result.
    pub fn merge(&mut self, other: ValidationResult) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// How `min`/`max` are measured for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Character count for strings, item count for lists
    Length,
    /// Numeric value
    Numeric,
}

/// The `validation` block of a field spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub email: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub url: bool,
}

impl ValidationRules {
    /// Read rules from a field config. Malformed entries are ignored.
    pub fn from_config(config: &Map<String, Value>) -> Self {
        let Some(Value::Object(rules)) = config.get("validation") else {
            return Self::default();
        };
        Self {
            min: rules.get("min").and_then(as_f64),
            max: rules.get("max").and_then(as_f64),
            pattern: rules
                .get("pattern")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            email: rules.get("email").map(is_truthy).unwrap_or(false),
            url: rules.get("url").map(is_truthy).unwrap_or(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate every rule against a non-empty value, accumulating errors.
    pub fn check(&self, value: &Value, measure: Measure, result: &mut ValidationResult) {
        if let Some(min) = self.min {
            check_min(value, min, measure, result);
        }
        if let Some(max) = self.max {
            check_max(value, max, measure, result);
        }
        if let Some(pattern) = &self.pattern {
            if let Some(re) = compile_pattern(pattern) {
                if !re.is_match(&value_to_string(value)) {
                    result.push("Does not match the required format.");
                }
            }
        }
        if self.email && !is_valid_email(&value_to_string(value)) {
            result.push("Must be a valid email address.");
        }
        if self.url && !is_valid_url(&value_to_string(value)) {
            result.push("Must be a valid URL.");
        }
    }
}

/// Run the universal `required` check.
///
/// Returns `false` when the value is empty, in which case no further rule
/// applies to it.
pub fn check_required(base: &FieldBase, value: &Value, result: &mut ValidationResult) -> bool {
    if is_empty(value) {
        if base.is_required() {
            result.push("This field is required.");
        }
        return false;
    }
    true
}

/// The default validation every leaf type starts from.
pub fn validate_default(base: &FieldBase, value: &Value, measure: Measure) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if check_required(base, value, &mut result) {
        base.rules().check(value, measure, &mut result);
    }
    result
}

pub fn check_min(value: &Value, min: f64, measure: Measure, result: &mut ValidationResult) {
    match measure {
        Measure::Numeric => {
            if as_f64(value).is_some_and(|n| n < min) {
                result.push(format!("Must be at least {}.", format_number(min)));
            }
        }
        Measure::Length => {
            if (measure_length(value) as f64) < min {
                result.push(length_message("at least", min, value));
            }
        }
    }
}

pub fn check_max(value: &Value, max: f64, measure: Measure, result: &mut ValidationResult) {
    match measure {
        Measure::Numeric => {
            if as_f64(value).is_some_and(|n| n > max) {
                result.push(format!("Must be no more than {}.", format_number(max)));
            }
        }
        Measure::Length => {
            if (measure_length(value) as f64) > max {
                result.push(length_message("no more than", max, value));
            }
        }
    }
}

fn length_message(bound: &str, limit: f64, value: &Value) -> String {
    match value {
        Value::Array(_) => format!("Must have {bound} {} item(s).", format_number(limit)),
        _ => format!("Must be {bound} {} characters.", format_number(limit)),
    }
}

fn measure_length(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(items) => items.len(),
        other => value_to_string(other).chars().count(),
    }
}

/// Compile a pattern, accepting `/body/flags` delimited forms.
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    let source = match delimited(pattern) {
        Some((body, flags)) if flags.contains('i') => format!("(?i){body}"),
        Some((body, _)) => body.to_string(),
        None => pattern.to_string(),
    };
    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(%pattern, %e, "ignoring invalid validation pattern");
            None
        }
    }
}

fn delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let flags = &rest[end + 1..];
    if flags.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((&rest[..end], flags))
    } else {
        None
    }
}

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// Absolute http(s)/ftp/mailto URLs, or references relative to the current
/// page (`/path`, `?query`, `#fragment`).
pub fn is_valid_url(candidate: &str) -> bool {
    if candidate.starts_with(['/', '?', '#']) {
        return url::Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(candidate))
            .is_ok();
    }
    match url::Url::parse(candidate) {
        Ok(parsed) => {
            URL_SCHEMES.contains(&parsed.scheme())
                && (parsed.scheme() == "mailto" || parsed.host().is_some())
        }
        Err(_) => false,
    }
}

/// Whether a value counts as "nothing submitted".
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(items) => items.is_empty(),
        Value::Number(_) => false,
    }
}

/// Loose truthiness for config flags and checkbox submissions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(items) => !items.is_empty(),
        Value::Null => false,
    }
}

/// Numbers and numeric strings as `f64`.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Coerce a scalar to its string form; collections become empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
