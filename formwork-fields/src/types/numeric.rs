//! Number and date inputs.
//!
//! Both short-circuit: when the value is not the expected primitive, the
//! type error is the only error reported for the field.

use chrono::NaiveDate;
use serde_json::{Number, Value};

use crate::base::FieldBase;
use crate::field::{display_value, Field};
use crate::render::{attr, common_attrs, wrap_field, RenderContext};
use crate::validation::{
    as_f64, check_max, check_min, check_required, format_number, value_to_string, Measure,
    ValidationResult,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct NumberField {
    base: FieldBase,
}

impl NumberField {
    pub fn new(base: FieldBase) -> Self {
        Self { base }
    }

    /// Type bound from config, overridden by the `validation` block.
    fn bound(&self, key: &str) -> Option<f64> {
        let rules = self.base.rules();
        let from_rules = if key == "min" { rules.min } else { rules.max };
        from_rules.or_else(|| self.base.get_f64(key))
    }
}

impl Field for NumberField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = value_to_string(&display_value(&self.base, value));
        let mut extra = String::new();
        for key in ["min", "max", "step"] {
            if let Some(n) = self.base.get_f64(key) {
                extra.push_str(&format!(" {key}=\"{}\"", format_number(n)));
            }
        }
        let control = format!(
            "<input type=\"number\"{} value=\"{}\"{}>",
            common_attrs(&self.base),
            attr(&current),
            extra
        );
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        match raw {
            Value::Number(_) => raw.clone(),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => to_number(n),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if !check_required(&self.base, value, &mut result) {
            return result;
        }
        let Some(number) = as_f64(value) else {
            result.push("Must be a valid number.");
            return result;
        };
        if let Some(min) = self.bound("min") {
            check_min(value, min, Measure::Numeric, &mut result);
        }
        if let Some(max) = self.bound("max") {
            check_max(value, max, Measure::Numeric, &mut result);
        }
        if let Some(step) = self.base.get_f64("step").filter(|s| *s > 0.0) {
            let origin = self.base.get_f64("min").unwrap_or(0.0);
            let steps = (number - origin) / step;
            if (steps - steps.round()).abs() > 1e-9 {
                result.push(format!("Must be a multiple of {}.", format_number(step)));
            }
        }
        if let Some(pattern) = self.base.rules().pattern {
            if let Some(re) = crate::validation::compile_pattern(&pattern) {
                if !re.is_match(&value_to_string(value)) {
                    result.push("Does not match the required format.");
                }
            }
        }
        result
    }
}

/// Integers stay integers so stored values round-trip cleanly.
fn to_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct DateField {
    base: FieldBase,
}

impl DateField {
    pub fn new(base: FieldBase) -> Self {
        Self { base }
    }

    fn bound(&self, key: &str) -> Option<NaiveDate> {
        self.base.get_str(key).and_then(parse_date)
    }
}

impl Field for DateField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
        let current = value_to_string(&display_value(&self.base, value));
        let mut extra = String::new();
        for key in ["min", "max"] {
            if let Some(date) = self.bound(key) {
                extra.push_str(&format!(" {key}=\"{}\"", date.format(DATE_FORMAT)));
            }
        }
        let control = format!(
            "<input type=\"date\"{} value=\"{}\"{}>",
            common_attrs(&self.base),
            attr(&current),
            extra
        );
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        let raw = value_to_string(raw);
        let trimmed = raw.trim();
        match parse_date(trimmed) {
            Some(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            // Kept verbatim so validation can report it
            None => Value::String(trimmed.to_string()),
        }
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::ok();
        if !check_required(&self.base, value, &mut result) {
            return result;
        }
        let Some(date) = value.as_str().and_then(parse_date) else {
            result.push("Must be a valid date (YYYY-MM-DD).");
            return result;
        };
        if let Some(min) = self.bound("min") {
            if date < min {
                result.push(format!("Must be on or after {}.", min.format(DATE_FORMAT)));
            }
        }
        if let Some(max) = self.bound("max") {
            if date > max {
                result.push(format!("Must be on or before {}.", max.format(DATE_FORMAT)));
            }
        }
        result
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}
