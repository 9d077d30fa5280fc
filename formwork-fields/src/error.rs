//! Error types for the field engine

use thiserror::Error;

/// Result type for field engine operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors raised while configuring or persisting fields.
///
/// Validation problems are never reported through this type; they are
/// returned as [`crate::ValidationResult`] so every problem surfaces at once.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// A field spec has no `name`
    #[error("field spec of type '{field_type}' has no name")]
    MissingName { field_type: String },

    /// A field spec has no `type`
    #[error("field spec '{name}' has no type")]
    MissingType { name: String },

    /// A field spec names a type nobody registered
    #[error("unknown field type '{field_type}' for field '{name}'")]
    UnknownType { name: String, field_type: String },

    /// A registered factory does not honour the Field contract
    #[error("factory registered for '{field_type}' does not satisfy the field contract: {reason}")]
    InvalidCustomType { field_type: String, reason: String },

    /// The persistence adapter failed to read or write a value
    #[error("persistence failed for '{name}' in context '{context}': {message}")]
    Persistence {
        context: String,
        name: String,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FieldsError {
    /// True for errors that concern a single bad spec and should only skip it.
    pub fn is_spec_error(&self) -> bool {
        matches!(
            self,
            FieldsError::MissingName { .. }
                | FieldsError::MissingType { .. }
                | FieldsError::UnknownType { .. }
        )
    }
}
