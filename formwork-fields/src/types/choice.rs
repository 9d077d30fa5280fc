//! Option-based inputs: select, radio and checkbox.

use serde_json::Value;

use crate::base::FieldBase;
use crate::field::{display_value, Field};
use crate::render::{attr, common_attrs, text, wrap_field, RenderContext};
use crate::validation::{
    check_required, is_truthy, value_to_string, Measure, ValidationResult,
};

/// Select drop-down or radio group.
#[derive(Debug, Clone)]
pub struct SelectField {
    base: FieldBase,
    radio: bool,
}

impl SelectField {
    pub fn select(base: FieldBase) -> Self {
        Self { base, radio: false }
    }

    pub fn radio(base: FieldBase) -> Self {
        Self { base, radio: true }
    }

    fn is_multiple(&self) -> bool {
        !self.radio && self.base.get_bool("multiple")
    }
}

impl Field for SelectField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = display_value(&self.base, value);
        let selected = selected_values(&current);
        let options = self.base.options();

        let control = if self.radio {
            let mut html = String::from("<fieldset class=\"formwork-radio-group\">");
            for (index, (key, label)) in options.iter().enumerate() {
                let checked = if selected.contains(key) { " checked" } else { "" };
                html.push_str(&format!(
                    "<label><input type=\"radio\" name=\"{}\" id=\"{}_{index}\" value=\"{}\"{checked}> {}</label>",
                    attr(self.base.name()),
                    attr(&self.base.html_id()),
                    attr(key),
                    text(label)
                ));
            }
            html.push_str("</fieldset>");
            html
        } else {
            let (name, multiple) = if self.is_multiple() {
                (format!("{}[]", self.base.name()), " multiple")
            } else {
                (self.base.name().to_string(), "")
            };
            let mut html = format!(
                "<select name=\"{}\" id=\"{}\"{multiple}{}>",
                attr(&name),
                attr(&self.base.html_id()),
                if self.base.is_required() { " required" } else { "" }
            );
            if !self.is_multiple() {
                if let Some(placeholder) = self.base.get_str("placeholder") {
                    html.push_str(&format!("<option value=\"\">{}</option>", text(placeholder)));
                }
            }
            for (key, label) in &options {
                let sel = if selected.contains(key) { " selected" } else { "" };
                html.push_str(&format!(
                    "<option value=\"{}\"{sel}>{}</option>",
                    attr(key),
                    text(label)
                ));
            }
            html.push_str("</select>");
            html
        };
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        if self.is_multiple() {
            let keys = selected_values(raw)
                .into_iter()
                .filter(|key| self.base.has_option(key))
                .map(Value::String)
                .collect();
            return Value::Array(keys);
        }
        let key = match raw {
            Value::Array(items) => items.first().map(value_to_string).unwrap_or_default(),
            other => value_to_string(other),
        };
        let key = key.trim().to_string();
        if self.base.has_option(&key) {
            Value::String(key)
        } else {
            Value::String(String::new())
        }
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if !check_required(&self.base, value, &mut result) {
            return result;
        }
        let invalid = selected_values(value)
            .iter()
            .any(|key| !self.base.has_option(key));
        if invalid {
            result.push("Invalid selection.");
        }
        self.base.rules().check(value, Measure::Length, &mut result);
        result
    }
}

/// Single checkbox (boolean) or, with `options`, a multi-checkbox list.
#[derive(Debug, Clone)]
pub struct CheckboxField {
    base: FieldBase,
}

impl CheckboxField {
    pub fn new(base: FieldBase) -> Self {
        Self { base }
    }

    pub fn is_multi(&self) -> bool {
        !self.base.options().is_empty()
    }
}

impl Field for CheckboxField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = display_value(&self.base, value);
        if !self.is_multi() {
            let checked = if is_truthy(&current) { " checked" } else { "" };
            let control = format!(
                "<input type=\"checkbox\"{} value=\"1\"{checked}>",
                common_attrs(&self.base)
            );
            return wrap_field(&self.base, &control);
        }
        let selected = selected_values(&current);
        let mut control = String::from("<fieldset class=\"formwork-checkbox-group\">");
        for (index, (key, label)) in self.base.options().iter().enumerate() {
            let checked = if selected.contains(key) { " checked" } else { "" };
            control.push_str(&format!(
                "<label><input type=\"checkbox\" name=\"{}[]\" id=\"{}_{index}\" value=\"{}\"{checked}> {}</label>",
                attr(self.base.name()),
                attr(&self.base.html_id()),
                attr(key),
                text(label)
            ));
        }
        control.push_str("</fieldset>");
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        if !self.is_multi() {
            return Value::Bool(is_truthy(raw));
        }
        let keys = selected_values(raw)
            .into_iter()
            .filter(|key| self.base.has_option(key))
            .map(Value::String)
            .collect();
        Value::Array(keys)
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if !check_required(&self.base, value, &mut result) {
            return result;
        }
        if self.is_multi() {
            let invalid = selected_values(value)
                .iter()
                .any(|key| !self.base.has_option(key));
            if invalid {
                result.push("Invalid selection.");
            }
            self.base.rules().check(value, Measure::Length, &mut result);
        }
        result
    }
}

/// Submitted selection(s) as option keys.
fn selected_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|key| !key.is_empty())
            .collect(),
        // Checkbox lists may arrive keyed by option: {"red": "1"}
        Value::Object(map) => map
            .iter()
            .filter(|(_, checked)| is_truthy(checked))
            .map(|(key, _)| key.clone())
            .collect(),
        Value::Null => Vec::new(),
        scalar => {
            let key = value_to_string(scalar);
            if key.is_empty() {
                Vec::new()
            } else {
                vec![key]
            }
        }
    }
}
