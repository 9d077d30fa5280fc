//! The Field contract.
//!
//! Every field type implements [`Field`]. Whether a field nests other fields
//! is expressed by [`FieldKind`], a tagged capability checked by matching on
//! the variant rather than by probing for methods.

use serde::Serialize;
use serde_json::Value;

use crate::base::FieldBase;
use crate::render::RenderContext;
use crate::spec::FieldSpec;
use crate::validation::{validate_default, Measure, ValidationResult, ValidationRules};

/// What a field is structurally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind<'a> {
    /// Owns and persists exactly one value
    Leaf,
    /// Owns no value; declares nested specs (group, tabs, metabox)
    Container(&'a [FieldSpec]),
    /// Owns a list of rows; the specs are the per-row template
    Repeater(&'a [FieldSpec]),
}

impl FieldKind<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Leaf => "leaf",
            FieldKind::Container(_) => "container",
            FieldKind::Repeater(_) => "repeater",
        }
    }
}

/// The interface every field type implements.
pub trait Field: Send + Sync + std::fmt::Debug {
    /// Name, type and config of this instance.
    fn base(&self) -> &FieldBase;

    /// Render the field for `value` as markup.
    fn render(&self, value: &Value, ctx: &mut RenderContext) -> String;

    /// Coerce raw submitted input into the stored shape. Must be total.
    fn sanitize(&self, raw: &Value) -> Value;

    /// Check a sanitized value.
    fn validate(&self, value: &Value) -> ValidationResult {
        validate_default(self.base(), value, Measure::Length)
    }

    fn kind(&self) -> FieldKind<'_> {
        FieldKind::Leaf
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn label(&self) -> String {
        self.base().label()
    }

    fn field_type(&self) -> &str {
        self.base().field_type()
    }

    fn config(&self, key: &str) -> Option<&Value> {
        self.base().get(key)
    }

    fn config_or(&self, key: &str, default: Value) -> Value {
        self.base().get_or(key, default)
    }

    fn is_container(&self) -> bool {
        !matches!(self.kind(), FieldKind::Leaf)
    }

    /// Specs this field nests; empty for leaves.
    fn nested_field_specs(&self) -> Vec<FieldSpec> {
        match self.kind() {
            FieldKind::Leaf => Vec::new(),
            FieldKind::Container(specs) | FieldKind::Repeater(specs) => specs.to_vec(),
        }
    }

    /// Descriptor for introspection and documentation tooling.
    fn schema(&self) -> FieldSchema {
        FieldSchema::describe(self.base(), self.kind())
    }
}

/// Serializable description of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub default: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SchemaOption>,
    #[serde(skip_serializing_if = "ValidationRules::is_empty")]
    pub validation: ValidationRules,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaOption {
    pub value: String,
    pub label: String,
}

impl FieldSchema {
    pub fn describe(base: &FieldBase, kind: FieldKind<'_>) -> Self {
        let children = match kind {
            FieldKind::Leaf => Vec::new(),
            FieldKind::Container(specs) | FieldKind::Repeater(specs) => specs.to_vec(),
        };
        Self {
            name: base.name().to_string(),
            field_type: base.field_type().to_string(),
            label: base.label(),
            kind: kind.label(),
            required: base.is_required(),
            description: base.description().map(str::to_string),
            default: base.default_value(),
            options: base
                .options()
                .into_iter()
                .map(|(value, label)| SchemaOption { value, label })
                .collect(),
            validation: base.rules(),
            children,
        }
    }
}

/// The value to display: the stored value, or the configured default.
pub(crate) fn display_value<'a>(base: &'a FieldBase, value: &'a Value) -> std::borrow::Cow<'a, Value> {
    if value.is_null() {
        std::borrow::Cow::Owned(base.default_value())
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}
