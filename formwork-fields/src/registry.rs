//! FieldTypeRegistry: maps a type name to the factory that builds it.
//!
//! The registry is an explicit value owned by whoever needs it; there is no
//! process-wide table. Built-in types are seeded lazily on first `create` and
//! never clobber a type the caller registered first. `reset()` returns the
//! registry to a clean defaults-only state.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::base::FieldBase;
use crate::container::{GroupField, MetaboxField, TabsField};
use crate::error::{FieldsError, Result};
use crate::field::Field;
use crate::repeater::RepeaterField;
use crate::spec::FieldSpec;
use crate::types::{CheckboxField, ColorField, DateField, NumberField, SelectField, TextField, TextKind};

const PROBE_NAME: &str = "__formwork_probe__";

/// Builds field instances of one type.
///
/// `types` is the registry doing the building; container types keep a copy
/// so they can instantiate their nested specs later.
pub trait FieldFactory: Send + Sync {
    fn create(&self, base: FieldBase, types: &FieldTypeRegistry) -> Box<dyn Field>;

    /// Config merged under every spec of this type (the spec's keys win).
    fn default_config(&self) -> Map<String, Value> {
        Map::new()
    }
}

impl<F> FieldFactory for F
where
    F: Fn(FieldBase, &FieldTypeRegistry) -> Box<dyn Field> + Send + Sync,
{
    fn create(&self, base: FieldBase, types: &FieldTypeRegistry) -> Box<dyn Field> {
        self(base, types)
    }
}

/// Factory for the built-in types.
struct Builtin {
    build: fn(FieldBase, &FieldTypeRegistry) -> Box<dyn Field>,
    defaults: fn() -> Map<String, Value>,
}

impl FieldFactory for Builtin {
    fn create(&self, base: FieldBase, types: &FieldTypeRegistry) -> Box<dyn Field> {
        (self.build)(base, types)
    }

    fn default_config(&self) -> Map<String, Value> {
        (self.defaults)()
    }
}

fn no_defaults() -> Map<String, Value> {
    Map::new()
}

fn textarea_defaults() -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("rows".into(), Value::from(5));
    config.insert("cols".into(), Value::from(50));
    config
}

fn repeater_defaults() -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("minRows".into(), Value::from(0));
    config.insert("maxRows".into(), Value::from(0));
    config.insert("buttonLabel".into(), Value::from("Add Row"));
    config.insert("rowLabel".into(), Value::from("Row {index}"));
    config
}

fn builtin_types() -> Vec<(&'static str, Builtin)> {
    fn plain(build: fn(FieldBase, &FieldTypeRegistry) -> Box<dyn Field>) -> Builtin {
        Builtin {
            build,
            defaults: no_defaults,
        }
    }

    vec![
        ("text", plain(|b, _| Box::new(TextField::new(b, TextKind::Text)))),
        (
            "textarea",
            Builtin {
                build: |b, _| Box::new(TextField::new(b, TextKind::Textarea)),
                defaults: textarea_defaults,
            },
        ),
        ("email", plain(|b, _| Box::new(TextField::new(b, TextKind::Email)))),
        ("url", plain(|b, _| Box::new(TextField::new(b, TextKind::Url)))),
        ("password", plain(|b, _| Box::new(TextField::new(b, TextKind::Password)))),
        ("hidden", plain(|b, _| Box::new(TextField::new(b, TextKind::Hidden)))),
        ("number", plain(|b, _| Box::new(NumberField::new(b)))),
        ("date", plain(|b, _| Box::new(DateField::new(b)))),
        ("color", plain(|b, _| Box::new(ColorField::new(b)))),
        ("select", plain(|b, _| Box::new(SelectField::select(b)))),
        ("radio", plain(|b, _| Box::new(SelectField::radio(b)))),
        ("checkbox", plain(|b, _| Box::new(CheckboxField::new(b)))),
        ("group", plain(|b, t| Box::new(GroupField::new(b, t.clone())))),
        ("tabs", plain(|b, t| Box::new(TabsField::new(b, t.clone())))),
        ("metabox", plain(|b, t| Box::new(MetaboxField::new(b, t.clone())))),
        (
            "repeater",
            Builtin {
                build: |b, t| Box::new(RepeaterField::new(b, t.clone())),
                defaults: repeater_defaults,
            },
        ),
    ]
}

/// Names of the types seeded by `load_defaults`.
pub fn builtin_type_names() -> Vec<&'static str> {
    builtin_types().into_iter().map(|(name, _)| name).collect()
}

/// Type name → factory table.
#[derive(Clone, Default)]
pub struct FieldTypeRegistry {
    factories: IndexMap<String, Arc<dyn FieldFactory>>,
    seeded: bool,
}

impl fmt::Debug for FieldTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTypeRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .field("seeded", &self.seeded)
            .finish()
    }
}

impl FieldTypeRegistry {
    /// An empty registry; built-ins are seeded on first `create`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in types already seeded.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.load_defaults();
        registry
    }

    /// Register a factory for `field_type`, replacing any previous one.
    ///
    /// The factory is probed first: the instance it builds must keep the
    /// name it was given and report `field_type` as its type.
    pub fn register<F>(&mut self, field_type: impl Into<String>, factory: F) -> Result<()>
    where
        F: FieldFactory + 'static,
    {
        let field_type = field_type.into();
        let factory: Arc<dyn FieldFactory> = Arc::new(factory);
        self.verify_contract(&field_type, factory.as_ref())?;

        if self.factories.insert(field_type.clone(), factory).is_some() {
            debug!(%field_type, "replaced field type registration");
        } else {
            debug!(%field_type, "registered field type");
        }
        Ok(())
    }

    fn verify_contract(&self, field_type: &str, factory: &dyn FieldFactory) -> Result<()> {
        let invalid = |reason: String| FieldsError::InvalidCustomType {
            field_type: field_type.to_string(),
            reason,
        };
        if field_type.trim().is_empty() {
            return Err(invalid("type name is empty".into()));
        }
        let base = FieldBase::new(PROBE_NAME, field_type, factory.default_config());
        let probe = factory.create(base, self);
        if probe.name() != PROBE_NAME {
            return Err(invalid(format!(
                "instance renamed itself to '{}'",
                probe.name()
            )));
        }
        if probe.field_type() != field_type {
            return Err(invalid(format!(
                "instance reports type '{}'",
                probe.field_type()
            )));
        }
        trace!(%field_type, kind = probe.kind().label(), "factory satisfied field contract");
        Ok(())
    }

    /// Seed the built-in types. Types already registered are kept.
    pub fn load_defaults(&mut self) {
        for (name, factory) in builtin_types() {
            if self.factories.contains_key(name) {
                trace!(field_type = name, "keeping custom registration over built-in");
                continue;
            }
            self.factories.insert(name.to_string(), Arc::new(factory));
        }
        self.seeded = true;
    }

    /// Drop every registration and return to the defaults-only state.
    pub fn reset(&mut self) {
        self.factories.clear();
        self.seeded = false;
        self.load_defaults();
        debug!("field type registry reset to defaults");
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn has_type(&self, field_type: &str) -> bool {
        self.factories.contains_key(field_type)
    }

    /// Registered type names in registration order.
    pub fn types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build a field from a spec, seeding the built-ins first if needed.
    pub fn create(&mut self, spec: &FieldSpec) -> Result<Box<dyn Field>> {
        if !self.seeded {
            self.load_defaults();
        }
        self.instantiate(spec)
    }

    /// Build a field from a spec using the types registered right now.
    pub fn instantiate(&self, spec: &FieldSpec) -> Result<Box<dyn Field>> {
        let field_type = spec
            .field_type
            .as_deref()
            .filter(|t| !t.is_empty());
        let name = match spec.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => {
                return Err(FieldsError::MissingName {
                    field_type: field_type.unwrap_or_default().to_string(),
                })
            }
        };
        let Some(field_type) = field_type else {
            return Err(FieldsError::MissingType {
                name: name.to_string(),
            });
        };
        let factory = self
            .factories
            .get(field_type)
            .ok_or_else(|| FieldsError::UnknownType {
                name: name.to_string(),
                field_type: field_type.to_string(),
            })?;

        let mut config = factory.default_config();
        for (key, value) in &spec.config {
            config.insert(key.clone(), value.clone());
        }
        Ok(factory.create(FieldBase::new(name, field_type, config), self))
    }

    /// Build many fields at once, keyed by name.
    ///
    /// A spec without a name takes its key (or position) instead. Specs that
    /// fail are skipped with a warning.
    pub fn create_many<K, I>(&mut self, specs: I) -> IndexMap<String, Box<dyn Field>>
    where
        K: ToString,
        I: IntoIterator<Item = (K, FieldSpec)>,
    {
        let mut fields = IndexMap::new();
        for (key, mut spec) in specs {
            if spec.name.as_deref().is_none_or(str::is_empty) {
                spec.name = Some(key.to_string());
            }
            match self.create(&spec) {
                Ok(field) => {
                    fields.insert(field.name().to_string(), field);
                }
                Err(e) => warn!(%e, "skipping field spec"),
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderContext;
    use crate::types::NumberField;
    use serde_json::json;

    #[derive(Debug)]
    struct SliderField {
        base: FieldBase,
    }

    impl Field for SliderField {
        fn base(&self) -> &FieldBase {
            &self.base
        }

        fn render(&self, value: &Value, _ctx: &mut RenderContext) -> String {
            format!("<input type=\"range\" value=\"{value}\">")
        }

        fn sanitize(&self, raw: &Value) -> Value {
            NumberField::new(self.base.clone()).sanitize(raw)
        }
    }

    struct SliderFactory;

    impl FieldFactory for SliderFactory {
        fn create(&self, base: FieldBase, _types: &FieldTypeRegistry) -> Box<dyn Field> {
            Box::new(SliderField { base })
        }

        fn default_config(&self) -> Map<String, Value> {
            let mut config = Map::new();
            config.insert("min".into(), json!(0));
            config.insert("max".into(), json!(10));
            config.insert("step".into(), json!(1));
            config
        }
    }

    fn spec(value: Value) -> FieldSpec {
        FieldSpec::from_value(value)
    }

    #[test]
    fn create_seeds_defaults_lazily() {
        let mut registry = FieldTypeRegistry::new();
        assert!(!registry.is_seeded());
        let field = registry.create(&spec(json!({"name": "title", "type": "text"}))).unwrap();
        assert!(registry.is_seeded());
        assert_eq!(field.field_type(), "text");
        assert_eq!(field.name(), "title");
    }

    #[test]
    fn custom_type_with_defaults_merged_under_spec() {
        let mut registry = FieldTypeRegistry::new();
        registry.register("slider", SliderFactory).unwrap();
        let field = registry
            .create(&spec(json!({"name": "q", "type": "slider", "min": 0, "max": 100})))
            .unwrap();
        assert_eq!(field.field_type(), "slider");
        assert_eq!(field.config("min"), Some(&json!(0)));
        assert_eq!(field.config("max"), Some(&json!(100)));
        assert_eq!(field.config("step"), Some(&json!(1)));
    }

    #[test]
    fn closure_factories_are_accepted() {
        let mut registry = FieldTypeRegistry::new();
        registry
            .register("integer", |base: FieldBase, _: &FieldTypeRegistry| {
                Box::new(NumberField::new(base)) as Box<dyn Field>
            })
            .unwrap();
        assert!(registry.has_type("integer"));
    }

    #[test]
    fn factory_reporting_wrong_type_is_rejected() {
        let mut registry = FieldTypeRegistry::new();
        let err = registry
            .register("money", |base: FieldBase, _: &FieldTypeRegistry| {
                Box::new(NumberField::new(FieldBase::new(
                    base.name(),
                    "number",
                    base.config().clone(),
                ))) as Box<dyn Field>
            })
            .unwrap_err();
        assert!(matches!(err, FieldsError::InvalidCustomType { .. }));
        assert!(!registry.has_type("money"));
    }

    #[test]
    fn factory_renaming_instance_is_rejected() {
        let mut registry = FieldTypeRegistry::new();
        let err = registry
            .register("fixed", |base: FieldBase, _: &FieldTypeRegistry| {
                Box::new(NumberField::new(base.renamed("always_this"))) as Box<dyn Field>
            })
            .unwrap_err();
        assert!(err.to_string().contains("renamed itself"));
    }

    #[test]
    fn load_defaults_keeps_custom_registration() {
        let mut registry = FieldTypeRegistry::new();
        registry.register("text", SliderFactory).unwrap();
        registry.load_defaults();
        registry.load_defaults();

        let field = registry.create(&spec(json!({"name": "t", "type": "text"}))).unwrap();
        assert!(field.render(&json!(3), &mut RenderContext::detached()).contains("range"));
        let text_count = registry.types().iter().filter(|t| **t == "text").count();
        assert_eq!(text_count, 1);
        assert_eq!(registry.types().len(), builtin_type_names().len());
    }

    #[test]
    fn reset_drops_custom_types() {
        let mut registry = FieldTypeRegistry::new();
        registry.register("slider", SliderFactory).unwrap();
        registry.reset();
        assert!(!registry.has_type("slider"));
        assert!(registry.has_type("repeater"));
        assert!(registry.is_seeded());
    }

    #[test]
    fn create_errors() {
        let mut registry = FieldTypeRegistry::new();
        assert!(matches!(
            registry.create(&spec(json!({"type": "text"}))),
            Err(FieldsError::MissingName { .. })
        ));
        assert!(matches!(
            registry.create(&spec(json!({"name": "x"}))),
            Err(FieldsError::MissingType { .. })
        ));
        assert!(matches!(
            registry.create(&spec(json!({"name": "x", "type": "wysiwyg"}))),
            Err(FieldsError::UnknownType { .. })
        ));
    }

    #[test]
    fn create_many_falls_back_to_keys() {
        let mut registry = FieldTypeRegistry::new();
        let fields = registry.create_many(vec![
            ("first", spec(json!({"type": "text"}))),
            ("second", spec(json!({"name": "explicit", "type": "number"}))),
            ("third", spec(json!({"type": "nope"}))),
        ]);
        assert_eq!(
            fields.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["first", "explicit"]
        );

        let by_position = registry.create_many(
            vec![spec(json!({"type": "text"}))].into_iter().enumerate(),
        );
        assert!(by_position.contains_key("0"));
    }

    #[test]
    fn textarea_defaults_apply() {
        let mut registry = FieldTypeRegistry::new();
        let field = registry
            .create(&spec(json!({"name": "bio", "type": "textarea", "rows": 8})))
            .unwrap();
        assert_eq!(field.config("rows"), Some(&json!(8)));
        assert_eq!(field.config("cols"), Some(&json!(50)));
    }
}
