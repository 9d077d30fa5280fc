//! Recursive flattening of container trees into per-context maps.

use formwork_fields::{FieldRegistrationService, FieldSpec, FieldTypeRegistry};
use serde_json::{json, Value};
use tracing_test::traced_test;

fn specs(value: Value) -> Vec<FieldSpec> {
    serde_json::from_value(value).expect("valid spec list")
}

fn settings_page() -> Vec<FieldSpec> {
    specs(json!([
        {"name": "site_title", "type": "text", "required": true},
        {
            "name": "contact",
            "type": "group",
            "fields": [
                {"name": "email", "type": "email"},
                {"name": "phone", "type": "text"},
                {"name": "fax", "type": "text"}
            ]
        }
    ]))
}

#[test]
fn container_contributes_itself_and_each_child() {
    let mut service = FieldRegistrationService::new();
    service.register_fields("general", settings_page());

    let fields = service.get_fields("general").unwrap();
    // site_title + contact + 3 children
    assert_eq!(fields.len(), 5);
    for name in ["email", "phone", "fax"] {
        assert!(service.is_nested("general", name), "{name} should be nested");
    }
    assert!(!service.is_nested("general", "contact"));
    assert!(!service.is_nested("general", "site_title"));
}

#[test]
fn nested_names_are_not_top_level() {
    let mut service = FieldRegistrationService::new();
    service.register_fields("general", settings_page());
    // The same name registered directly is still treated as nested
    service.register_fields("general", vec![FieldSpec::new("phone", "text")]);

    let top: Vec<String> = service
        .top_level_fields("general")
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(top, vec!["site_title", "contact"]);
}

#[test]
fn tabs_inside_metabox_flatten_all_the_way_down() {
    let mut service = FieldRegistrationService::new();
    service.register_fields(
        12u64,
        specs(json!([{
            "name": "product",
            "type": "metabox",
            "title": "Product",
            "fields": [{
                "name": "sections",
                "type": "tabs",
                "tabs": [
                    {"id": "pricing", "fields": [{"name": "price", "type": "number"}]},
                    {"id": "stock", "fields": [{"name": "sku", "type": "text"}]}
                ]
            }]
        }])),
    );

    let flat = service.flattened(12u64).unwrap();
    let names: Vec<&str> = flat.names().collect();
    assert_eq!(names, vec!["product", "sections", "price", "sku"]);
    assert_eq!(
        flat.nested_names().iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["sections", "price", "sku"]
    );

    let persistable: Vec<String> = service
        .persistable_fields(12u64)
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(persistable, vec!["price", "sku"]);
}

#[test]
fn repeater_sub_fields_are_nested_but_not_persisted_alone() {
    let mut service = FieldRegistrationService::new();
    service.register_fields(
        "general",
        specs(json!([{
            "name": "links",
            "type": "repeater",
            "fields": [{"name": "url", "type": "url"}, {"name": "label", "type": "text"}]
        }])),
    );

    assert!(service.is_nested("general", "url"));
    let persistable: Vec<String> = service
        .persistable_fields("general")
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(persistable, vec!["links"]);
}

#[test]
#[traced_test]
fn unknown_types_are_skipped_with_a_warning() {
    let mut service = FieldRegistrationService::new();
    service.register_fields(
        "general",
        specs(json!([
            {"name": "ok", "type": "text"},
            {"name": "fancy", "type": "wysiwyg"},
            {"type": "text"}
        ])),
    );

    let names: Vec<&str> = service.flattened("general").unwrap().names().collect();
    assert_eq!(names, vec!["ok"]);
    assert!(logs_contain("skipping field spec"));
    assert!(logs_contain("wysiwyg"));
}

#[test]
fn custom_types_registered_on_the_service_registry_are_used() {
    let mut registry = FieldTypeRegistry::new();
    registry
        .register(
            "slug",
            |base: formwork_fields::FieldBase, _: &FieldTypeRegistry| {
                Box::new(formwork_fields::TextField::new(
                    base,
                    formwork_fields::TextKind::Text,
                )) as Box<dyn formwork_fields::Field>
            },
        )
        .unwrap();

    let mut service = FieldRegistrationService::with_registry(registry);
    service.register_fields(
        "general",
        specs(json!([
            {"name": "extra", "type": "group", "fields": [{"name": "handle", "type": "slug"}]}
        ])),
    );
    let handle = service.get_field("general", "handle").unwrap();
    assert_eq!(handle.field_type(), "slug");
}

#[test]
fn contexts_are_independent() {
    let mut service = FieldRegistrationService::new();
    service.register_fields("general", vec![FieldSpec::new("a", "text")]);
    service.register_fields(1u64, vec![FieldSpec::new("a", "number")]);

    assert_eq!(service.get_field("general", "a").unwrap().field_type(), "text");
    assert_eq!(service.get_field(1u64, "a").unwrap().field_type(), "number");
    assert_eq!(service.contexts().len(), 2);
    assert!(!service.has_fields("missing"));
}
