use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::base::FieldBase;
use crate::field::{display_value, Field};
use crate::render::{attr, common_attrs, wrap_field, RenderContext};
use crate::validation::{check_required, value_to_string, ValidationResult};

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-f]{3}|[0-9a-f]{6})$").expect("hex pattern is valid"));

/// Hex colour picker storing `#rgb` or `#rrggbb`.
#[derive(Debug, Clone)]
pub struct ColorField {
    base: FieldBase,
}

impl ColorField {
    pub fn new(base: FieldBase) -> Self {
        Self { base }
    }
}

impl Field for ColorField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = value_to_string(&display_value(&self.base, value));
        let control = format!(
            "<input type=\"color\"{} value=\"{}\">",
            common_attrs(&self.base),
            attr(&current)
        );
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        let candidate = value_to_string(raw).trim().to_ascii_lowercase();
        let candidate = if candidate.starts_with('#') || candidate.is_empty() {
            candidate
        } else {
            format!("#{candidate}")
        };
        if HEX_RE.is_match(&candidate) {
            Value::String(candidate)
        } else {
            Value::String(String::new())
        }
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if check_required(&self.base, value, &mut result)
            && !HEX_RE.is_match(&value_to_string(value))
        {
            result.push("Must be a hex colour such as #1e90ff.");
        }
        result
    }
}
