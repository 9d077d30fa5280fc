use std::path::Path;

use figment::providers::{Format, Json, Toml, Yaml};
use figment::Figment;

use crate::error::{ConfigError, ConfigResult};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (.toml extension)
    Toml,
    /// YAML format (.yaml or .yml extensions)
    Yaml,
    /// JSON format (.json extension)
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from a path, failing on unknown extensions.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| ConfigError::UnsupportedFormat {
            format: if ext.is_empty() {
                path.display().to_string()
            } else {
                ext.to_string()
            },
        })
    }

    pub(crate) fn file(self, path: &Path) -> Figment {
        match self {
            Self::Toml => Figment::from(Toml::file(path)),
            Self::Yaml => Figment::from(Yaml::file(path)),
            Self::Json => Figment::from(Json::file(path)),
        }
    }

    pub(crate) fn string(self, content: &str) -> Figment {
        match self {
            Self::Toml => Figment::from(Toml::string(content)),
            Self::Yaml => Figment::from(Yaml::string(content)),
            Self::Json => Figment::from(Json::string(content)),
        }
    }
}
