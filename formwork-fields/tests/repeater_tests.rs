//! Repeater behaviour through the public registry API.

use formwork_fields::{Field, FieldSpec, FieldTypeRegistry, RenderContext};
use serde_json::{json, Value};

fn build(spec: Value) -> Box<dyn Field> {
    let mut registry = FieldTypeRegistry::new();
    registry
        .create(&FieldSpec::from_value(spec))
        .expect("repeater spec builds")
}

fn items(min_rows: u64, max_rows: u64) -> Box<dyn Field> {
    build(json!({
        "name": "items",
        "type": "repeater",
        "minRows": min_rows,
        "maxRows": max_rows,
        "fields": [{"name": "item", "type": "text"}]
    }))
}

fn materialized_rows(html: &str) -> usize {
    // The template row carries the placeholder index instead of a number
    html.matches("class=\"formwork-repeater-row\" data-index=\"")
        .count()
        - html.matches("data-index=\"__INDEX_items__\"").count()
}

#[test]
fn empty_value_renders_min_rows() {
    let repeater = items(1, 3);
    let html = repeater.render(&json!([]), &mut RenderContext::detached());
    assert_eq!(materialized_rows(&html), 1);
    assert!(html.contains("name=\"items[0][item]\""));
    assert!(!html.contains("name=\"items[1][item]\""));
}

#[test]
fn over_max_rows_disables_add_without_truncating() {
    let repeater = items(1, 3);
    let rows = json!([{"item": "a"}, {"item": "b"}, {"item": "c"}, {"item": "d"}]);
    let html = repeater.render(&rows, &mut RenderContext::detached());

    assert_eq!(materialized_rows(&html), 4);
    assert!(html.contains("value=\"d\""));
    assert!(html.contains("class=\"formwork-repeater-add\" disabled"));
    assert!(html.contains("data-max-rows=\"3\""));
}

#[test]
fn add_stays_enabled_below_max() {
    let repeater = items(0, 3);
    let html = repeater.render(&json!([{"item": "a"}]), &mut RenderContext::detached());
    assert!(html.contains("<button type=\"button\" class=\"formwork-repeater-add\">"));
}

#[test]
fn sanitize_trims_and_drops_empty_rows() {
    let repeater = items(1, 3);
    assert_eq!(
        repeater.sanitize(&json!([{"item": "  A  "}, {"item": ""}])),
        json!([{"item": "A"}])
    );
}

#[test]
fn too_few_rows_is_reported() {
    let repeater = items(2, 0);
    let result = repeater.validate(&json!([{"item": "x"}]));
    assert!(!result.valid);
    assert!(result.errors.iter().any(|e| e.contains("2 row(s) required")));
}

#[test]
fn required_sub_field_error_names_the_row() {
    let repeater = build(json!({
        "name": "contacts",
        "type": "repeater",
        "fields": [{"name": "email", "type": "email", "required": true}]
    }));
    let result = repeater.validate(&json!([{"email": ""}]));
    assert!(!result.valid);
    assert_eq!(result.errors, vec!["Row 1 - Email: This field is required."]);
}

#[test]
fn repeater_script_emitted_once_per_pass() {
    let first = items(0, 0);
    let second = build(json!({
        "name": "others",
        "type": "repeater",
        "fields": [{"name": "other", "type": "text"}]
    }));
    let mut ctx = RenderContext::new("general");
    let a = first.render(&json!([]), &mut ctx);
    let b = second.render(&json!([]), &mut ctx);
    assert!(a.contains("data-formwork-asset=\"repeater\""));
    assert!(!b.contains("data-formwork-asset=\"repeater\""));
    assert!(ctx.was_emitted("formwork-repeater"));
}

#[test]
fn sub_field_instances_are_not_shared_between_rows() {
    let repeater = build(json!({
        "name": "people",
        "type": "repeater",
        "fields": [{"name": "age", "type": "number", "min": 18}]
    }));
    let result = repeater.validate(&json!([{"age": 30}, {"age": 12}, {"age": 40}]));
    assert_eq!(result.errors, vec!["Row 2 - Age: Must be at least 18."]);
}

#[test]
fn schema_lists_row_template() {
    let repeater = items(0, 5);
    let schema = repeater.schema();
    assert_eq!(schema.kind, "repeater");
    assert_eq!(schema.children.len(), 1);
    assert_eq!(repeater.nested_field_specs()[0].name.as_deref(), Some("item"));
}
