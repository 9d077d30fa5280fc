//! RepeaterField: a sub-field template instantiated once per data row.
//!
//! Unlike the other containers the repeater owns its value, the full list of
//! rows. Every row gets fresh sub-field instances; nothing is shared between
//! rows. Row bounds (`minRows`, `maxRows`, 0 meaning unbounded) are enforced
//! by `validate`, never by `sanitize` or `render`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::base::{humanize, FieldBase};
use crate::field::{Field, FieldKind};
use crate::registry::FieldTypeRegistry;
use crate::render::{attr, text, wrap_field, RenderContext};
use crate::spec::FieldSpec;
use crate::validation::{as_f64, is_empty, ValidationResult};

/// Nesting allowed for containers inside a row template.
const ROW_TEMPLATE_DEPTH: usize = 16;

/// One materialized row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub index: usize,
    pub values: Map<String, Value>,
}

impl Row {
    pub fn value(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct RepeaterField {
    base: FieldBase,
    types: FieldTypeRegistry,
    sub_specs: Vec<FieldSpec>,
}

impl RepeaterField {
    pub fn new(base: FieldBase, types: FieldTypeRegistry) -> Self {
        let sub_specs = FieldSpec::specs_under(base.config(), "fields");
        Self {
            base,
            types,
            sub_specs,
        }
    }

    /// The row template, constant across rows.
    pub fn sub_field_specs(&self) -> &[FieldSpec] {
        &self.sub_specs
    }

    pub fn min_rows(&self) -> usize {
        self.base.get_usize("minRows").unwrap_or(0)
    }

    /// Upper bound on rows; 0 means unbounded.
    pub fn max_rows(&self) -> usize {
        self.base.get_usize("maxRows").unwrap_or(0)
    }

    pub fn button_label(&self) -> &str {
        self.base.get_str("buttonLabel").unwrap_or("Add Row")
    }

    /// Heading of a row; `{index}` is replaced by the 1-based row number.
    pub fn row_label(&self, index: usize) -> String {
        self.base
            .get_str("rowLabel")
            .unwrap_or("Row {index}")
            .replace("{index}", &(index + 1).to_string())
    }

    pub fn is_collapsible(&self) -> bool {
        self.base.get_bool("collapsible")
    }

    pub fn is_sortable(&self) -> bool {
        self.base.get_bool("sortable")
    }

    /// Whether the add-row control is disabled for `row_count` rows.
    pub fn add_disabled(&self, row_count: usize) -> bool {
        let max = self.max_rows();
        max != 0 && row_count >= max
    }

    /// Index placeholder carried by this repeater's row template.
    ///
    /// Keyed by the repeater's own name, so a repeater nested in another's
    /// row (`outer[__INDEX_outer__][inner]`) gets `__INDEX_inner__`.
    pub fn index_placeholder(&self) -> String {
        let name = self.base.name();
        let key = name
            .strip_suffix(']')
            .and_then(|rest| rest.rsplit('[').next())
            .unwrap_or(name);
        format!("__INDEX_{key}__")
    }

    /// Read stored or submitted rows.
    ///
    /// Accepts a list of row objects or an object keyed by row position.
    /// Anything else is no rows; a row that is not an object is empty.
    pub fn rows(value: &Value) -> Vec<Row> {
        let raw: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(items) => items.values().collect(),
            _ => return Vec::new(),
        };
        raw.into_iter()
            .enumerate()
            .map(|(index, row)| Row {
                index,
                values: row.as_object().cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Specs of every value-owning field in a row.
    ///
    /// Containers inside the template are unwrapped; their leaves store their
    /// values directly in the row.
    pub fn row_field_specs(&self) -> Vec<FieldSpec> {
        let mut specs = Vec::new();
        self.collect_row_specs(&self.sub_specs, 0, &mut specs);
        specs
    }

    fn collect_row_specs(&self, specs: &[FieldSpec], depth: usize, out: &mut Vec<FieldSpec>) {
        if depth > ROW_TEMPLATE_DEPTH {
            warn!(
                repeater = self.base.name(),
                "row template nested too deeply, ignoring the rest"
            );
            return;
        }
        for spec in specs {
            let field = match self.types.instantiate(spec) {
                Ok(field) => field,
                Err(e) => {
                    warn!(repeater = self.base.name(), %e, "skipping sub-field");
                    continue;
                }
            };
            match field.kind() {
                FieldKind::Container(nested) => {
                    self.collect_row_specs(nested, depth + 1, out);
                }
                FieldKind::Leaf | FieldKind::Repeater(_) => out.push(spec.clone()),
            }
        }
    }

    /// Fresh sub-field instances for one row.
    fn row_fields(&self, specs: &[FieldSpec]) -> Vec<Box<dyn Field>> {
        specs
            .iter()
            .filter_map(|spec| self.types.instantiate(spec).ok())
            .collect()
    }

    /// Sub-field spec addressed inside row `slot`, e.g. `links[0][url]`.
    fn addressed(&self, spec: &FieldSpec, slot: &str) -> FieldSpec {
        let mut spec = spec.clone();
        let name = spec.name.clone().unwrap_or_default();
        if !spec.config.contains_key("label") {
            spec.config
                .insert("label".into(), Value::String(humanize(&name)));
        }
        spec.name = Some(format!("{}[{slot}][{name}]", self.base.name()));
        spec
    }

    fn render_row(
        &self,
        specs: &[FieldSpec],
        slot: &str,
        heading: &str,
        values: &Map<String, Value>,
        ctx: &mut RenderContext,
    ) -> String {
        let mut html = format!(
            "<div class=\"formwork-repeater-row-header\"><span class=\"formwork-repeater-row-label\">{}</span><button type=\"button\" class=\"formwork-repeater-remove\">Remove</button></div>",
            text(heading)
        );
        for spec in specs {
            let original = spec.name.as_deref().unwrap_or_default();
            match self.types.instantiate(&self.addressed(spec, slot)) {
                Ok(field) => {
                    let value = values.get(original).unwrap_or(&Value::Null);
                    html.push_str(&field.render(value, ctx));
                }
                Err(e) => warn!(repeater = self.base.name(), %e, "skipping sub-field"),
            }
        }
        html
    }
}

impl Field for RepeaterField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn kind(&self) -> FieldKind<'_> {
        FieldKind::Repeater(&self.sub_specs)
    }

    fn render(&self, value: &Value, ctx: &mut RenderContext) -> String {
        let rows = Self::rows(value);
        let specs = self.row_field_specs();
        let shown = rows.len().max(self.min_rows());
        let empty = Map::new();

        let mut body = String::from("<div class=\"formwork-repeater-rows\">");
        for index in 0..shown {
            let values = rows.get(index).map(|row| &row.values).unwrap_or(&empty);
            body.push_str(&format!(
                "<div class=\"formwork-repeater-row\" data-index=\"{index}\">{}</div>",
                self.render_row(&specs, &index.to_string(), &self.row_label(index), values, ctx)
            ));
        }
        body.push_str("</div>");

        let placeholder = self.index_placeholder();
        let template_heading = self
            .base
            .get_str("rowLabel")
            .unwrap_or("Row {index}")
            .to_string();
        body.push_str(&format!(
            "<template class=\"formwork-repeater-template\" data-persist=\"false\"><div class=\"formwork-repeater-row\" data-index=\"{}\">{}</div></template>",
            attr(&placeholder),
            self.render_row(&specs, &placeholder, &template_heading, &empty, ctx)
        ));

        let disabled = if self.add_disabled(rows.len()) { " disabled" } else { "" };
        body.push_str(&format!(
            "<button type=\"button\" class=\"formwork-repeater-add\"{disabled}>{}</button>",
            text(self.button_label())
        ));

        if ctx.emit_once("formwork-repeater") {
            body.push_str("<script data-formwork-asset=\"repeater\"></script>");
        }

        let control = format!(
            "<div class=\"formwork-repeater\" id=\"{}\" data-index-placeholder=\"{}\" data-min-rows=\"{}\" data-max-rows=\"{}\" data-collapsible=\"{}\" data-sortable=\"{}\">{body}</div>",
            attr(&self.base.html_id()),
            attr(&placeholder),
            self.min_rows(),
            self.max_rows(),
            self.is_collapsible(),
            self.is_sortable()
        );
        wrap_field(&self.base, &control)
    }

    fn sanitize(&self, raw: &Value) -> Value {
        let specs = self.row_field_specs();
        let mut kept = Vec::new();
        for row in Self::rows(raw) {
            let mut values = Map::new();
            for field in self.row_fields(&specs) {
                let cleaned = field.sanitize(row.value(field.name()));
                values.insert(field.name().to_string(), cleaned);
            }
            if values.values().all(is_falsey) {
                trace!(repeater = self.base.name(), row = row.index, "dropping empty row");
                continue;
            }
            kept.push(Value::Object(values));
        }
        Value::Array(kept)
    }

    fn validate(&self, value: &Value) -> ValidationResult {
        let rows = match value {
            Value::Array(_) => Self::rows(value),
            _ => Vec::new(),
        };
        let mut result = ValidationResult::ok();

        let min = self.min_rows();
        if min > 0 && rows.len() < min {
            result.push(format!("At least {min} row(s) required."));
        }
        let max = self.max_rows();
        if max > 0 && rows.len() > max {
            result.push(format!("Maximum {max} row(s) allowed."));
        }

        let specs = self.row_field_specs();
        for row in &rows {
            for field in self.row_fields(&specs) {
                let label = field.label();
                for error in field.validate(row.value(field.name())).errors {
                    result.push(format!("Row {} - {label}: {error}", row.index + 1));
                }
            }
        }
        result
    }
}

/// Row-level emptiness: blank values, `false`, `0` and `"0"` all count.
fn is_falsey(value: &Value) -> bool {
    if is_empty(value) {
        return true;
    }
    match value {
        Value::Number(_) => as_f64(value) == Some(0.0),
        Value::String(s) => s.trim() == "0",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repeater(config: Value) -> RepeaterField {
        let mut config = config.as_object().cloned().unwrap();
        config
            .entry("fields")
            .or_insert_with(|| json!([{"name": "item", "type": "text"}]));
        RepeaterField::new(
            FieldBase::new("items", "repeater", config),
            FieldTypeRegistry::with_defaults(),
        )
    }

    #[test]
    fn rows_accept_lists_and_keyed_objects() {
        let listed = RepeaterField::rows(&json!([{"item": "a"}, "junk"]));
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].value("item"), &json!("a"));
        assert!(listed[1].values.is_empty());

        let keyed = RepeaterField::rows(&json!({"0": {"item": "a"}, "1": {"item": "b"}}));
        assert_eq!(keyed[1].index, 1);
        assert!(RepeaterField::rows(&json!("nope")).is_empty());
    }

    #[test]
    fn sanitize_drops_empty_rows_and_reindexes() {
        let f = repeater(json!({}));
        let cleaned = f.sanitize(&json!([{"item": ""}, {"item": " B "}, {"other": "x"}]));
        assert_eq!(cleaned, json!([{"item": "B"}]));
        assert_eq!(f.sanitize(&json!(42)), json!([]));
    }

    #[test]
    fn sanitize_drops_rows_of_zeroes() {
        let f = repeater(json!({
            "fields": [
                {"name": "qty", "type": "number"},
                {"name": "t", "type": "text"}
            ]
        }));
        let cleaned = f.sanitize(&json!([
            {"qty": 0, "t": ""},
            {"qty": "", "t": "0"},
            {"qty": 0, "t": "note"},
            {"qty": 2, "t": ""}
        ]));
        assert_eq!(
            cleaned,
            json!([{"qty": 0, "t": "note"}, {"qty": 2, "t": ""}])
        );
    }

    #[test]
    fn sanitize_keeps_row_with_any_value() {
        let f = repeater(json!({
            "fields": [
                {"name": "label", "type": "text"},
                {"name": "url", "type": "url"}
            ]
        }));
        let cleaned = f.sanitize(&json!([{"label": "", "url": "example.com"}]));
        assert_eq!(cleaned, json!([{"label": "", "url": "http://example.com"}]));
    }

    #[test]
    fn validate_reports_bounds_and_row_errors() {
        let f = repeater(json!({
            "minRows": 1,
            "maxRows": 1,
            "fields": [{"name": "email", "type": "email", "label": "Email", "required": true}]
        }));
        let result = f.validate(&json!([{"email": ""}, {"email": "bad"}]));
        assert_eq!(
            result.errors,
            vec![
                "Maximum 1 row(s) allowed.",
                "Row 1 - Email: This field is required.",
                "Row 2 - Email: Must be a valid email address.",
            ]
        );
    }

    #[test]
    fn validate_treats_non_list_as_no_rows() {
        let f = repeater(json!({"minRows": 1}));
        let result = f.validate(&json!("x"));
        assert_eq!(result.errors, vec!["At least 1 row(s) required."]);
    }

    #[test]
    fn render_addresses_sub_fields_per_row() {
        let f = repeater(json!({}));
        let html = f.render(&json!([{"item": "first"}]), &mut RenderContext::detached());
        assert!(html.contains("name=\"items[0][item]\""));
        assert!(html.contains("value=\"first\""));
        assert!(html.contains("name=\"items[__INDEX_items__][item]\""));
        assert!(html.contains("Row 1"));
    }

    #[test]
    fn nested_repeater_templates_use_distinct_placeholders() {
        let f = RepeaterField::new(
            FieldBase::new(
                "o",
                "repeater",
                json!({"fields": [
                    {"name": "i", "type": "repeater", "fields": [{"name": "x", "type": "text"}]}
                ]})
                .as_object()
                .cloned()
                .unwrap(),
            ),
            FieldTypeRegistry::with_defaults(),
        );
        assert_eq!(f.index_placeholder(), "__INDEX_o__");

        let html = f.render(&json!([]), &mut RenderContext::detached());
        assert!(html.contains("name=\"o[__INDEX_o__][i][__INDEX_i__][x]\""));
        assert!(html.contains("data-index-placeholder=\"__INDEX_i__\""));
    }

    #[test]
    fn template_row_is_not_persistent() {
        let f = repeater(json!({}));
        let html = f.render(&json!([]), &mut RenderContext::detached());
        assert!(html.contains("data-persist=\"false\""));
    }

    #[test]
    fn containers_in_template_are_unwrapped() {
        let f = repeater(json!({
            "fields": [
                {"name": "meta", "type": "group", "fields": [
                    {"name": "title", "type": "text"},
                    {"name": "year", "type": "number"}
                ]}
            ]
        }));
        let names: Vec<_> = f
            .row_field_specs()
            .into_iter()
            .filter_map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["title", "year"]);
        assert_eq!(
            f.sanitize(&json!([{"title": "Dune", "year": "1965"}])),
            json!([{"title": "Dune", "year": 1965}])
        );
    }

    #[test]
    fn row_label_is_one_based() {
        let f = repeater(json!({"rowLabel": "Link #{index}"}));
        assert_eq!(f.row_label(0), "Link #1");
        assert_eq!(f.button_label(), "Add Row");
    }
}
