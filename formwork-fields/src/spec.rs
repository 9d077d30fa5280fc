//! Declarative field specifications and context identifiers.
//!
//! A [`FieldSpec`] is the immutable input the engine builds fields from. Only
//! `name` and `type` are lifted out; every other key stays in `config` so
//! custom field types can read whatever keys they need.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single declarative field specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub field_type: Option<String>,
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl FieldSpec {
    /// Create a spec with a name and type and no further config.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            field_type: Some(field_type.into()),
            config: Map::new(),
        }
    }

    /// Add a config key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Build a spec from a loose JSON object.
    ///
    /// Non-object values yield an empty spec, which the registry rejects
    /// with a missing-name error.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Read a list of child specs stored under `key` (e.g. `fields`).
    pub fn specs_under(config: &Map<String, Value>, key: &str) -> Vec<FieldSpec> {
        match config.get(key) {
            Some(Value::Array(items)) => items.iter().cloned().map(FieldSpec::from_value).collect(),
            // Keyed maps fall back to the key as the child name
            Some(Value::Object(items)) => items
                .iter()
                .map(|(key, item)| {
                    let mut spec = FieldSpec::from_value(item.clone());
                    if spec.name.is_none() {
                        spec.name = Some(key.clone());
                    }
                    spec
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Identifies where a set of fields is attached: an entity id or a named page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextId {
    Entity(u64),
    Named(String),
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Entity(id) => write!(f, "{id}"),
            ContextId::Named(name) => f.write_str(name),
        }
    }
}

impl From<u64> for ContextId {
    fn from(id: u64) -> Self {
        ContextId::Entity(id)
    }
}

impl From<&str> for ContextId {
    fn from(name: &str) -> Self {
        ContextId::Named(name.to_string())
    }
}

impl From<String> for ContextId {
    fn from(name: String) -> Self {
        ContextId::Named(name)
    }
}
