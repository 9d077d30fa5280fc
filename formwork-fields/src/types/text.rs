//! Single-value text inputs: text, textarea, email, url, password, hidden.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::base::FieldBase;
use crate::field::{display_value, Field};
use crate::render::{attr, common_attrs, text, wrap_field, RenderContext};
use crate::validation::{
    check_required, is_valid_email, is_valid_url, value_to_string, ValidationResult,
};
use crate::validation::{check_max, Measure};

static TAGS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space pattern is valid"));

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

/// Which text input this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Textarea,
    Email,
    Url,
    Password,
    Hidden,
}

impl TextKind {
    fn input_type(self) -> &'static str {
        match self {
            TextKind::Text | TextKind::Textarea => "text",
            TextKind::Email => "email",
            TextKind::Url => "url",
            TextKind::Password => "password",
            TextKind::Hidden => "hidden",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextField {
    base: FieldBase,
    kind: TextKind,
}

impl TextField {
    pub fn new(base: FieldBase, kind: TextKind) -> Self {
        Self { base, kind }
    }

    pub fn text_kind(&self) -> TextKind {
        self.kind
    }

    fn maxlength_attr(&self) -> String {
        self.base
            .get_usize("maxlength")
            .map(|n| format!(" maxlength=\"{n}\""))
            .unwrap_or_default()
    }

    fn class_attr(&self) -> String {
        self.base
            .css_class()
            .map(|c| format!(" class=\"{}\"", attr(c)))
            .unwrap_or_default()
    }
}

impl Field for TextField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = value_to_string(&display_value(&self.base, value));
        match self.kind {
            TextKind::Hidden => format!(
                "<input type=\"hidden\" name=\"{}\" id=\"{}\" value=\"{}\">",
                attr(self.base.name()),
                attr(&self.base.html_id()),
                attr(&current)
            ),
            TextKind::Textarea => {
                let rows = self.base.get_usize("rows").unwrap_or(5);
                let cols = self.base.get_usize("cols").unwrap_or(50);
                let control = format!(
                    "<textarea{} rows=\"{rows}\" cols=\"{cols}\"{}{}>{}</textarea>",
                    common_attrs(&self.base),
                    self.maxlength_attr(),
                    self.class_attr(),
                    text(&current)
                );
                wrap_field(&self.base, &control)
            }
            TextKind::Password => {
                // Stored secrets are never echoed back
                let control = format!(
                    "<input type=\"password\"{} value=\"\" autocomplete=\"new-password\"{}>",
                    common_attrs(&self.base),
                    self.class_attr()
                );
                wrap_field(&self.base, &control)
            }
            kind => {
                let control = format!(
                    "<input type=\"{}\"{} value=\"{}\"{}{}>",
                    kind.input_type(),
                    common_attrs(&self.base),
                    attr(&current),
                    self.maxlength_attr(),
                    self.class_attr()
                );
                wrap_field(&self.base, &control)
            }
        }
    }

    fn sanitize(&self, raw: &Value) -> Value {
        let raw = value_to_string(raw);
        let cleaned = match self.kind {
            TextKind::Text | TextKind::Hidden => sanitize_text(&raw),
            TextKind::Textarea => sanitize_textarea(&raw),
            TextKind::Email => sanitize_email(&raw),
            TextKind::Url => sanitize_url(&raw),
            TextKind::Password => raw,
        };
        Value::String(cleaned)
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if !check_required(&self.base, value, &mut result) {
            return result;
        }
        let rules = self.base.rules();
        rules.check(value, Measure::Length, &mut result);

        if rules.max.is_none() {
            if let Some(maxlength) = self.base.get_usize("maxlength") {
                check_max(value, maxlength as f64, Measure::Length, &mut result);
            }
        }
        let current = value_to_string(value);
        match self.kind {
            TextKind::Email if !rules.email && !is_valid_email(&current) => {
                result.push("Must be a valid email address.");
            }
            TextKind::Url if !rules.url && !is_valid_url(&current) => {
                result.push("Must be a valid URL.");
            }
            _ => {}
        }
        result
    }
}

pub fn strip_tags(input: &str) -> String {
    TAGS_RE.replace_all(input, "").replace('\0', "")
}

/// Strip tags, fold line breaks and runs of whitespace, trim.
pub fn sanitize_text(input: &str) -> String {
    let stripped = strip_tags(input);
    SPACES_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Strip tags and normalise line endings, keeping line breaks.
pub fn sanitize_textarea(input: &str) -> String {
    strip_tags(input)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

pub fn sanitize_email(input: &str) -> String {
    strip_tags(input)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Trim, refuse script-bearing schemes, default bare hosts to `http://`.
pub fn sanitize_url(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return cleaned;
    }
    let lower = cleaned.to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return String::new();
    }
    let relative = cleaned.starts_with('/') || cleaned.starts_with('#') || cleaned.starts_with('?');
    if !relative && !cleaned.contains("://") && !lower.starts_with("mailto:") {
        return format!("http://{cleaned}");
    }
    cleaned
}
