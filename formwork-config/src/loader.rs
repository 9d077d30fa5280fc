//! Loading declarative field layouts with Figment.
//!
//! A layout file maps group names to lists of contexts, each with an `id`,
//! free-form metadata and a `fields` list:
//!
//! ```yaml
//! settings:
//!   - id: general
//!     title: General
//!     fields:
//!       - { name: site_title, type: text, required: true }
//! entities:
//!   - id: 42
//!     fields:
//!       - { name: subtitle, type: text }
//! ```
//!
//! Sources are append-merged in the order they are added, so the same group
//! may be spread over several files.

use std::path::{Path, PathBuf};

use figment::Figment;
use formwork_fields::{ContextId, FieldRegistrationService, FieldSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::format::ConfigFormat;

/// One context: where a field set is attached, plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub id: ContextId,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Host-facing keys such as `title`, `menu` or `post_type`
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A whole layout: group name → contexts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormConfig {
    groups: IndexMap<String, Vec<ContextConfig>>,
}

impl FormConfig {
    pub fn groups(&self) -> &IndexMap<String, Vec<ContextConfig>> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> &[ContextConfig] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every context across all groups, in declaration order.
    pub fn contexts(&self) -> impl Iterator<Item = &ContextConfig> {
        self.groups.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Reject layouts the engine cannot attach.
    pub fn validate(&self) -> ConfigResult<()> {
        for (group, contexts) in &self.groups {
            for (position, context) in contexts.iter().enumerate() {
                if let ContextId::Named(name) = &context.id {
                    if name.trim().is_empty() {
                        return Err(ConfigError::ValidationError {
                            message: format!("context {position} in group '{group}' has an empty id"),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Register every context's fields with `service`.
    ///
    /// Returns the number of contexts registered. Bad field specs are skipped
    /// by the service with a warning.
    pub fn apply(&self, service: &mut FieldRegistrationService) -> usize {
        let mut count = 0;
        for (group, contexts) in &self.groups {
            for context in contexts {
                if context.fields.is_empty() {
                    warn!(%group, context = %context.id, "context declares no fields");
                }
                service.register_fields(context.id.clone(), context.fields.iter().cloned());
                count += 1;
            }
        }
        debug!(contexts = count, "applied field configuration");
        count
    }
}

/// Builds a [`FormConfig`] from files and strings.
pub struct ConfigLoader {
    figment: Figment,
    sources: Vec<String>,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("sources", &self.sources)
            .finish()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            sources: Vec::new(),
        }
    }

    /// Add a file; the format comes from its extension.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path)?;
        trace!(path = %path.display(), ?format, "adding layout file");
        self.figment = self.figment.admerge(format.file(path));
        self.sources.push(path.display().to_string());
        Ok(self)
    }

    /// Add every supported file directly inside `dir`, in file name order.
    pub fn with_directory(mut self, dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfigError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|source| ConfigError::FileRead {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .and_then(ConfigFormat::from_extension)
                        .is_some()
            })
            .collect();
        files.sort();
        debug!(dir = %dir.display(), files = files.len(), "discovered layout files");
        for file in files {
            self = self.with_file(file)?;
        }
        Ok(self)
    }

    /// Add inline content in the given format.
    pub fn with_str(mut self, content: &str, format: ConfigFormat) -> Self {
        self.figment = self.figment.admerge(format.string(content));
        self.sources.push(format!("<inline {format:?}>"));
        self
    }

    /// Sources added so far, in merge order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Extract and validate the merged layout.
    pub fn load(&self) -> ConfigResult<FormConfig> {
        let config: FormConfig = self.figment.extract()?;
        config.validate()?;
        debug!(
            sources = self.sources.len(),
            groups = config.groups.len(),
            "loaded field configuration"
        );
        Ok(config)
    }
}

/// Load a single layout file.
pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<FormConfig> {
    ConfigLoader::new().with_file(path)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
settings:
  - id: general
    title: General
    fields:
      - name: site_title
        type: text
        required: true
entities:
  - id: 42
    post_type: book
    fields:
      - name: subtitle
        type: text
"#;

    #[test]
    fn test_yaml_layout() {
        let config = ConfigLoader::new()
            .with_str(YAML, ConfigFormat::Yaml)
            .load()
            .unwrap();

        let settings = config.group("settings");
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].id, ContextId::from("general"));
        assert_eq!(settings[0].metadata.get("title"), Some(&Value::from("General")));
        assert_eq!(settings[0].fields[0].name.as_deref(), Some("site_title"));

        let entities = config.group("entities");
        assert_eq!(entities[0].id, ContextId::Entity(42));
        assert!(config.group("missing").is_empty());
    }

    #[test]
    fn test_sources_append() {
        let loader = ConfigLoader::new()
            .with_str(YAML, ConfigFormat::Yaml)
            .with_str(
                r#"{"settings": [{"id": "advanced", "fields": []}]}"#,
                ConfigFormat::Json,
            );
        let config = loader.load().unwrap();
        let ids: Vec<String> = config
            .group("settings")
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, vec!["general", "advanced"]);
        assert_eq!(loader.sources().len(), 2);
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = ConfigLoader::new()
            .with_str(r#"{"settings": [{"id": " "}]}"#, ConfigFormat::Json)
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_apply_registers_contexts() {
        let config = ConfigLoader::new()
            .with_str(YAML, ConfigFormat::Yaml)
            .load()
            .unwrap();
        let mut service = FieldRegistrationService::new();
        assert_eq!(config.apply(&mut service), 2);
        assert!(service.has_fields("general"));
        assert!(service.has_fields(42u64));
    }

    #[test]
    fn test_empty_loader() {
        let config = ConfigLoader::new().load().unwrap();
        assert!(config.is_empty());
    }
}
