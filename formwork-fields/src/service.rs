//! FieldRegistrationService: per-context flattening, rendering and saving.
//!
//! Fields are registered against a [`ContextId`]. Every registration
//! rebuilds that context's [`FlattenedRegistry`] from all of its inputs:
//! containers are unwrapped recursively and each descendant name is recorded
//! as nested. Save and render passes walk the flattened map and talk to a
//! [`ValuePersistenceAdapter`] for storage.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::field::{Field, FieldKind};
use crate::persistence::ValuePersistenceAdapter;
use crate::pipeline::{process_field, FieldOutcome, SaveReport};
use crate::registry::FieldTypeRegistry;
use crate::render::RenderContext;
use crate::spec::{ContextId, FieldSpec};

/// Nesting depth at which flattening gives up on a branch.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Something that can be registered: a spec to build, or a ready field.
#[derive(Debug, Clone)]
pub enum FieldInput {
    Spec(FieldSpec),
    Field(Arc<dyn Field>),
}

impl From<FieldSpec> for FieldInput {
    fn from(spec: FieldSpec) -> Self {
        FieldInput::Spec(spec)
    }
}

impl From<Arc<dyn Field>> for FieldInput {
    fn from(field: Arc<dyn Field>) -> Self {
        FieldInput::Field(field)
    }
}

impl From<Box<dyn Field>> for FieldInput {
    fn from(field: Box<dyn Field>) -> Self {
        FieldInput::Field(Arc::from(field))
    }
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        FieldInput::Spec(FieldSpec::from_value(value))
    }
}

/// The flat name → field map of one context.
#[derive(Debug, Clone, Default)]
pub struct FlattenedRegistry {
    fields: IndexMap<String, Arc<dyn Field>>,
    nested_names: IndexSet<String>,
}

impl FlattenedRegistry {
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Field>> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every field, containers and descendants alike, in flattening order.
    pub fn fields(&self) -> &IndexMap<String, Arc<dyn Field>> {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Whether `name` was produced by unwrapping a container.
    pub fn is_nested(&self, name: &str) -> bool {
        self.nested_names.contains(name)
    }

    pub fn nested_names(&self) -> &IndexSet<String> {
        &self.nested_names
    }

    /// Fields registered directly and never reached through a container.
    pub fn top_level(&self) -> Vec<Arc<dyn Field>> {
        self.fields
            .iter()
            .filter(|(name, _)| !self.is_nested(name))
            .map(|(_, field)| Arc::clone(field))
            .collect()
    }

    fn insert(&mut self, field: Arc<dyn Field>, nested: bool) {
        let name = field.name().to_string();
        if nested {
            self.nested_names.insert(name.clone());
        }
        if let Some(previous) = self.fields.insert(name.clone(), field) {
            debug!(
                field = %name,
                replaced_type = previous.field_type(),
                "duplicate field name, keeping the last registration"
            );
        }
    }
}

/// Registers field sets per context and drives render and save passes.
pub struct FieldRegistrationService {
    registry: FieldTypeRegistry,
    inputs: IndexMap<ContextId, Vec<FieldInput>>,
    flattened: IndexMap<ContextId, FlattenedRegistry>,
    max_depth: usize,
}

impl fmt::Debug for FieldRegistrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistrationService")
            .field("registry", &self.registry)
            .field("contexts", &self.flattened.keys().collect::<Vec<_>>())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for FieldRegistrationService {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldRegistrationService {
    pub fn new() -> Self {
        Self::with_registry(FieldTypeRegistry::new())
    }

    /// Use a registry that already carries custom types.
    pub fn with_registry(registry: FieldTypeRegistry) -> Self {
        Self {
            registry,
            inputs: IndexMap::new(),
            flattened: IndexMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }

    /// Mutable access for registering types. Existing contexts are rebuilt
    /// with the new types on their next registration.
    pub fn registry_mut(&mut self) -> &mut FieldTypeRegistry {
        &mut self.registry
    }

    /// Add fields to a context and rebuild its flattened map.
    ///
    /// Inputs that fail to build are skipped with a warning; the rest are
    /// still registered.
    pub fn register_fields<I, T>(&mut self, context: impl Into<ContextId>, inputs: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldInput>,
    {
        let context = context.into();
        if !self.registry.is_seeded() {
            self.registry.load_defaults();
        }
        let added: Vec<FieldInput> = inputs.into_iter().map(Into::into).collect();
        debug!(%context, count = added.len(), "registering fields");
        self.inputs.entry(context.clone()).or_default().extend(added);
        self.rebuild(&context);
    }

    fn rebuild(&mut self, context: &ContextId) {
        let mut flat = FlattenedRegistry::default();
        for input in self.inputs.get(context).into_iter().flatten() {
            let field = match input {
                FieldInput::Field(field) => Arc::clone(field),
                FieldInput::Spec(spec) => match self.registry.instantiate(spec) {
                    Ok(field) => Arc::from(field),
                    Err(e) => {
                        warn!(%context, %e, "skipping field spec");
                        continue;
                    }
                },
            };
            self.flatten(context, field, 0, false, &mut flat);
        }
        trace!(
            %context,
            fields = flat.len(),
            nested = flat.nested_names.len(),
            "flattened context"
        );
        self.flattened.insert(context.clone(), flat);
    }

    fn flatten(
        &self,
        context: &ContextId,
        field: Arc<dyn Field>,
        depth: usize,
        nested: bool,
        flat: &mut FlattenedRegistry,
    ) {
        let children = field.nested_field_specs();
        flat.insert(field, nested);
        if children.is_empty() {
            return;
        }
        if depth >= self.max_depth {
            warn!(%context, depth, "field nesting too deep, not descending further");
            return;
        }
        for spec in &children {
            match self.registry.instantiate(spec) {
                Ok(child) => self.flatten(context, Arc::from(child), depth + 1, true, flat),
                Err(e) => warn!(%context, %e, "skipping nested field spec"),
            }
        }
    }

    /// The flattened map of a context.
    pub fn get_fields(&self, context: impl Into<ContextId>) -> Option<&IndexMap<String, Arc<dyn Field>>> {
        self.flattened.get(&context.into()).map(FlattenedRegistry::fields)
    }

    pub fn get_field(&self, context: impl Into<ContextId>, name: &str) -> Option<Arc<dyn Field>> {
        self.flattened.get(&context.into())?.get(name).cloned()
    }

    pub fn flattened(&self, context: impl Into<ContextId>) -> Option<&FlattenedRegistry> {
        self.flattened.get(&context.into())
    }

    pub fn has_fields(&self, context: impl Into<ContextId>) -> bool {
        self.flattened
            .get(&context.into())
            .is_some_and(|flat| !flat.is_empty())
    }

    pub fn is_nested(&self, context: impl Into<ContextId>, name: &str) -> bool {
        self.flattened
            .get(&context.into())
            .is_some_and(|flat| flat.is_nested(name))
    }

    pub fn top_level_fields(&self, context: impl Into<ContextId>) -> Vec<Arc<dyn Field>> {
        self.flattened
            .get(&context.into())
            .map(FlattenedRegistry::top_level)
            .unwrap_or_default()
    }

    /// Contexts with registrations, in first-registration order.
    pub fn contexts(&self) -> Vec<&ContextId> {
        self.flattened.keys().collect()
    }

    /// Forget every input and field of a context.
    pub fn clear_context(&mut self, context: impl Into<ContextId>) {
        let context = context.into();
        self.inputs.shift_remove(&context);
        if self.flattened.shift_remove(&context).is_some() {
            debug!(%context, "cleared context");
        }
    }

    /// Fields that own a stored value: top-level leaves and repeaters plus the
    /// leaves and repeaters reached through containers. Each name appears once.
    pub fn persistable_fields(&self, context: impl Into<ContextId>) -> Vec<Arc<dyn Field>> {
        let context = context.into();
        let Some(flat) = self.flattened.get(&context) else {
            return Vec::new();
        };
        let mut seen = IndexSet::new();
        let mut out = Vec::new();
        for field in flat.top_level() {
            self.collect_persistable(&context, flat, &field, 0, &mut seen, &mut out);
        }
        out
    }

    fn collect_persistable(
        &self,
        context: &ContextId,
        flat: &FlattenedRegistry,
        field: &Arc<dyn Field>,
        depth: usize,
        seen: &mut IndexSet<String>,
        out: &mut Vec<Arc<dyn Field>>,
    ) {
        match field.kind() {
            FieldKind::Leaf | FieldKind::Repeater(_) => {
                if seen.insert(field.name().to_string()) {
                    out.push(Arc::clone(field));
                }
            }
            FieldKind::Container(specs) => {
                if depth >= self.max_depth {
                    warn!(%context, field = field.name(), "field nesting too deep, not descending further");
                    return;
                }
                for name in specs.iter().filter_map(|spec| spec.name.as_deref()) {
                    if let Some(child) = flat.get(name) {
                        self.collect_persistable(context, flat, child, depth + 1, seen, out);
                    }
                }
            }
        }
    }

    /// Sanitize, validate and store every persistable field of a context.
    ///
    /// A field missing from `payload` is deleted. A field that fails
    /// validation is reported and the adapter is not called for it, so its
    /// previously stored value stays as it was.
    pub fn save<A>(
        &self,
        context: impl Into<ContextId>,
        payload: &Map<String, Value>,
        adapter: &mut A,
    ) -> Result<SaveReport>
    where
        A: ValuePersistenceAdapter + ?Sized,
    {
        let context = context.into();
        let mut report = SaveReport::default();
        for field in self.persistable_fields(context.clone()) {
            let name = field.name();
            match process_field(field.as_ref(), payload.get(name)) {
                FieldOutcome::Skipped => {}
                FieldOutcome::Delete => {
                    adapter.delete(&context, name)?;
                    report.deleted.push(name.to_string());
                }
                FieldOutcome::Save(value) => {
                    adapter.set(&context, name, value)?;
                    report.saved.push(name.to_string());
                }
                FieldOutcome::Rejected(errors) => {
                    debug!(%context, field = name, errors = errors.len(), "field failed validation, not saved");
                    report.errors.insert(name.to_string(), errors);
                }
            }
        }
        debug!(
            %context,
            saved = report.saved.len(),
            deleted = report.deleted.len(),
            rejected = report.errors.len(),
            "save pass complete"
        );
        Ok(report)
    }

    /// Render every top-level field of a context with its stored value.
    ///
    /// Containers receive an object of their descendants' stored values.
    pub fn render<A>(&self, context: impl Into<ContextId>, adapter: &A) -> Result<String>
    where
        A: ValuePersistenceAdapter + ?Sized,
    {
        let context = context.into();
        let Some(flat) = self.flattened.get(&context) else {
            return Ok(String::new());
        };
        let mut ctx = RenderContext::new(context.clone());
        let mut html = String::new();
        for field in flat.top_level() {
            let value = match field.kind() {
                FieldKind::Container(_) => {
                    let mut seen = IndexSet::new();
                    let mut descendants = Vec::new();
                    self.collect_persistable(&context, flat, &field, 0, &mut seen, &mut descendants);
                    let mut values = Map::new();
                    for child in descendants {
                        if let Some(stored) = adapter.get(&context, child.name())? {
                            values.insert(child.name().to_string(), stored);
                        }
                    }
                    Value::Object(values)
                }
                FieldKind::Leaf | FieldKind::Repeater(_) => {
                    adapter.get(&context, field.name())?.unwrap_or(Value::Null)
                }
            };
            html.push_str(&field.render(&value, &mut ctx));
        }
        Ok(html)
    }
}
