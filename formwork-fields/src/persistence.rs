//! Where a field's value lives.
//!
//! The save and render orchestration only talks to [`ValuePersistenceAdapter`].
//! Two storage shapes ship with the crate: entity-keyed values
//! ([`MetaStore`]) and named options holding one map per context
//! ([`OptionStore`], and its file-backed twin [`YamlOptionStore`]).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::spec::ContextId;

/// get / set / delete for one field value in one context.
pub trait ValuePersistenceAdapter {
    fn get(&self, context: &ContextId, name: &str) -> Result<Option<Value>>;

    fn set(&mut self, context: &ContextId, name: &str, value: Value) -> Result<()>;

    fn exists(&self, context: &ContextId, name: &str) -> Result<bool> {
        Ok(self.get(context, name)?.is_some())
    }

    fn delete(&mut self, context: &ContextId, name: &str) -> Result<()>;
}

fn persistence_error(context: &ContextId, name: &str, message: impl Into<String>) -> FieldsError {
    FieldsError::Persistence {
        context: context.to_string(),
        name: name.to_string(),
        message: message.into(),
    }
}

/// Values stored against an entity id, one slot per field.
///
/// Only [`ContextId::Entity`] contexts are accepted.
#[derive(Debug, Clone, Default)]
pub struct MetaStore {
    prefix: String,
    values: HashMap<(u64, String), Value>,
}

impl MetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every storage key, e.g. `_formwork_`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            values: HashMap::new(),
        }
    }

    pub fn storage_key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn slot(&self, context: &ContextId, name: &str) -> Result<(u64, String)> {
        match context {
            ContextId::Entity(id) => Ok((*id, self.storage_key(name))),
            ContextId::Named(_) => Err(persistence_error(
                context,
                name,
                "entity storage needs an entity id",
            )),
        }
    }

    /// Number of stored values across all entities.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValuePersistenceAdapter for MetaStore {
    fn get(&self, context: &ContextId, name: &str) -> Result<Option<Value>> {
        let slot = self.slot(context, name)?;
        Ok(self.values.get(&slot).cloned())
    }

    fn set(&mut self, context: &ContextId, name: &str, value: Value) -> Result<()> {
        let slot = self.slot(context, name)?;
        trace!(%context, key = %slot.1, "meta set");
        self.values.insert(slot, value);
        Ok(())
    }

    fn delete(&mut self, context: &ContextId, name: &str) -> Result<()> {
        let slot = self.slot(context, name)?;
        trace!(%context, key = %slot.1, "meta delete");
        self.values.remove(&slot);
        Ok(())
    }
}

/// Named options: one map of field values per context.
///
/// The option name is the prefix followed by the context, so a settings page
/// `general` with prefix `formwork_` is stored under `formwork_general`.
#[derive(Debug, Clone, Default)]
pub struct OptionStore {
    prefix: String,
    options: IndexMap<String, Map<String, Value>>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            options: IndexMap::new(),
        }
    }

    pub fn option_name(&self, context: &ContextId) -> String {
        format!("{}{context}", self.prefix)
    }

    /// The whole stored map for a context.
    pub fn option(&self, context: &ContextId) -> Option<&Map<String, Value>> {
        self.options.get(&self.option_name(context))
    }
}

impl ValuePersistenceAdapter for OptionStore {
    fn get(&self, context: &ContextId, name: &str) -> Result<Option<Value>> {
        Ok(self.option(context).and_then(|values| values.get(name)).cloned())
    }

    fn set(&mut self, context: &ContextId, name: &str, value: Value) -> Result<()> {
        let option = self.option_name(context);
        self.options
            .entry(option)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, context: &ContextId, name: &str) -> Result<()> {
        let option = self.option_name(context);
        if let Some(values) = self.options.get_mut(&option) {
            values.remove(name);
        }
        Ok(())
    }
}

/// Named options persisted as one YAML file per option in a directory.
///
/// Every write goes to a temp file in the same directory and is renamed
/// over the target.
#[derive(Debug, Clone)]
pub struct YamlOptionStore {
    root: PathBuf,
    prefix: String,
}

impl YamlOptionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(path = %root.display(), "opened yaml option store");
        Ok(Self {
            root,
            prefix: String::new(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the option for `context`.
    ///
    /// The option name is percent-encoded, so distinct contexts never share
    /// a file: `a/b` is stored in `a%2Fb.yaml`, `a_b` in `a_b.yaml`.
    pub fn option_path(&self, context: &ContextId) -> PathBuf {
        let option = format!("{}{context}", self.prefix);
        self.root
            .join(format!("{}.yaml", urlencoding::encode(&option)))
    }

    /// Read the whole option map for a context; a missing file is empty.
    pub fn load(&self, context: &ContextId) -> Result<Map<String, Value>> {
        let path = self.option_path(context);
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let values: Map<String, Value> = serde_yaml_ng::from_str(&content)?;
        trace!(path = %path.display(), count = values.len(), "loaded option file");
        Ok(values)
    }

    fn store(&self, context: &ContextId, values: &Map<String, Value>) -> Result<()> {
        let path = self.option_path(context);
        let yaml = serde_yaml_ng::to_string(values)?;
        atomic_write(&path, yaml.as_bytes())?;
        debug!(path = %path.display(), count = values.len(), "wrote option file");
        Ok(())
    }
}

impl ValuePersistenceAdapter for YamlOptionStore {
    fn get(&self, context: &ContextId, name: &str) -> Result<Option<Value>> {
        Ok(self.load(context)?.get(name).cloned())
    }

    fn set(&mut self, context: &ContextId, name: &str, value: Value) -> Result<()> {
        let mut values = self.load(context)?;
        values.insert(name.to_string(), value);
        self.store(context, &values)
    }

    fn delete(&mut self, context: &ContextId, name: &str) -> Result<()> {
        let mut values = self.load(context)?;
        if values.remove(name).is_some() {
            self.store(context, &values)?;
        }
        Ok(())
    }
}

/// Write to a temp file then rename into place.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    if let Err(e) = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, path)) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            trace!(path = %tmp.display(), %cleanup, "temp file not removed");
        }
        return Err(e.into());
    }
    Ok(())
}
