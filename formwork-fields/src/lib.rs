//! Field composition and validation engine
//!
//! `formwork-fields` turns declarative field specifications into typed field
//! objects, flattens container trees into one addressable map per context,
//! and runs every submitted value through a sanitize → validate pipeline
//! before handing it to a storage adapter.
//!
//! # Architecture
//!
//! - **Explicit registry**: `FieldTypeRegistry` maps type names to factories; no global state
//! - **Tagged capability**: `FieldKind` says whether a field is a leaf, a container or a repeater
//! - **Containers own no data**: only leaves and repeaters are persisted
//! - **Repeater rows**: one fresh set of sub-fields per row, bounds enforced at validation
//! - **Storage-agnostic**: values go through a `ValuePersistenceAdapter`
//!
//! ```
//! use formwork_fields::{FieldRegistrationService, FieldSpec, OptionStore};
//! use serde_json::json;
//!
//! let mut service = FieldRegistrationService::new();
//! service.register_fields("general", vec![
//!     FieldSpec::new("site_title", "text").with("required", true),
//! ]);
//!
//! let mut store = OptionStore::new();
//! let payload = json!({"site_title": "  Acme  "});
//! let report = service
//!     .save("general", payload.as_object().unwrap(), &mut store)
//!     .unwrap();
//! assert!(report.is_valid());
//! ```

pub mod base;
pub mod container;
pub mod error;
pub mod field;
pub mod persistence;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod repeater;
pub mod service;
pub mod spec;
pub mod types;
pub mod validation;

pub use base::FieldBase;
pub use container::{GroupField, MetaboxField, Tab, TabsField};
pub use error::{FieldsError, Result};
pub use field::{Field, FieldKind, FieldSchema, SchemaOption};
pub use persistence::{MetaStore, OptionStore, ValuePersistenceAdapter, YamlOptionStore};
pub use pipeline::{process_field, FieldOutcome, SaveReport};
pub use registry::{builtin_type_names, FieldFactory, FieldTypeRegistry};
pub use render::RenderContext;
pub use repeater::{RepeaterField, Row};
pub use service::{FieldInput, FieldRegistrationService, FlattenedRegistry, DEFAULT_MAX_DEPTH};
pub use spec::{ContextId, FieldSpec};
pub use types::{CheckboxField, ColorField, DateField, NumberField, SelectField, TextField, TextKind};
pub use validation::{ValidationResult, ValidationRules};
