//! Shared state and config accessors for every field type.

use serde_json::{Map, Value};

use crate::validation::{as_f64, is_truthy, ValidationRules};

/// The resolved name, type and merged config of one field instance.
///
/// Field types compose a `FieldBase` rather than re-implementing the common
/// keys (`label`, `description`, `default`, `required`, `class`, `validation`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBase {
    name: String,
    field_type: String,
    config: Map<String, Value>,
}

impl FieldBase {
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Config value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.config.get(key).cloned().unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.config.get(key).map(is_truthy).unwrap_or(false)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(as_f64)
    }

    /// Non-negative integer config, tolerating numeric strings.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_f64(key)
            .filter(|n| *n >= 0.0)
            .map(|n| n as usize)
    }

    /// Explicit `label`, or the name turned into words.
    pub fn label(&self) -> String {
        match self.get_str("label") {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => humanize(&self.name),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description").filter(|d| !d.is_empty())
    }

    pub fn is_required(&self) -> bool {
        self.get_bool("required")
    }

    pub fn default_value(&self) -> Value {
        self.get_or("default", Value::Null)
    }

    pub fn css_class(&self) -> Option<&str> {
        self.get_str("class").filter(|c| !c.is_empty())
    }

    pub fn rules(&self) -> ValidationRules {
        ValidationRules::from_config(&self.config)
    }

    /// The `options` key as ordered `(value, label)` pairs.
    ///
    /// Accepts a `{value: label}` map, a list of plain values, or a list of
    /// `{value, label}` objects.
    pub fn options(&self) -> Vec<(String, String)> {
        match self.config.get("options") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(value, label)| (value.clone(), scalar_label(label, value)))
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(entry) => {
                        let value = entry.get("value").map(crate::validation::value_to_string)?;
                        let label = entry
                            .get("label")
                            .map(|l| scalar_label(l, &value))
                            .unwrap_or_else(|| value.clone());
                        Some((value, label))
                    }
                    Value::Null => None,
                    scalar => {
                        let value = crate::validation::value_to_string(scalar);
                        Some((value.clone(), value))
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options().iter().any(|(key, _)| key == value)
    }

    /// DOM id derived from the (possibly bracketed) input name.
    pub fn html_id(&self) -> String {
        let id: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        id.trim_matches('_').replace("__", "_")
    }

    /// Same type and config under a different input name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: self.field_type.clone(),
            config: self.config.clone(),
        }
    }
}

fn scalar_label(label: &Value, fallback: &str) -> String {
    match label {
        Value::String(s) => s.clone(),
        Value::Null => fallback.to_string(),
        other => crate::validation::value_to_string(other),
    }
}

/// `billing_address-line` becomes `Billing Address Line`.
pub fn humanize(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(config: Value) -> FieldBase {
        FieldBase::new("first_name", "text", config.as_object().cloned().unwrap())
    }

    #[test]
    fn label_falls_back_to_humanized_name() {
        assert_eq!(base(json!({})).label(), "First Name");
        assert_eq!(base(json!({"label": "Given name"})).label(), "Given name");
    }

    #[test]
    fn options_from_map() {
        let field = base(json!({"options": {"s": "Small", "l": "Large"}}));
        assert_eq!(
            field.options(),
            vec![("s".into(), "Small".into()), ("l".into(), "Large".into())]
        );
        assert!(field.has_option("l"));
        assert!(!field.has_option("m"));
    }

    #[test]
    fn options_from_list_forms() {
        let field = base(json!({"options": ["red", {"value": "blue", "label": "Blue"}, 3]}));
        assert_eq!(
            field.options(),
            vec![
                ("red".into(), "red".into()),
                ("blue".into(), "Blue".into()),
                ("3".into(), "3".into())
            ]
        );
    }

    #[test]
    fn html_id_from_bracketed_name() {
        let field = FieldBase::new("links[0][url]", "url", Map::new());
        assert_eq!(field.html_id(), "links_0_url");
    }

    #[test]
    fn numeric_config_accepts_strings() {
        let field = base(json!({"maxlength": "40", "min": -2}));
        assert_eq!(field.get_usize("maxlength"), Some(40));
        assert_eq!(field.get_usize("min"), None);
        assert_eq!(field.get_f64("min"), Some(-2.0));
    }
}
