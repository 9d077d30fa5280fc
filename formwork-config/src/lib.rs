//! Formwork field layouts using Figment
//!
//! Declarative field layouts live in TOML, YAML or JSON files. This crate
//! loads and merges them with figment, checks that every context can be
//! attached, and registers the result with a
//! [`formwork_fields::FieldRegistrationService`].
//!
//! ```
//! use formwork_config::{ConfigFormat, ConfigLoader};
//! use formwork_fields::FieldRegistrationService;
//!
//! let layout = r#"
//! [[settings]]
//! id = "general"
//!
//! [[settings.fields]]
//! name = "site_title"
//! type = "text"
//! "#;
//!
//! let config = ConfigLoader::new()
//!     .with_str(layout, ConfigFormat::Toml)
//!     .load()?;
//!
//! let mut service = FieldRegistrationService::new();
//! config.apply(&mut service);
//! assert!(service.has_fields("general"));
//! # Ok::<(), formwork_config::ConfigError>(())
//! ```

pub mod error;
pub mod format;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use format::ConfigFormat;
pub use loader::{load_file, ConfigLoader, ContextConfig, FormConfig};
