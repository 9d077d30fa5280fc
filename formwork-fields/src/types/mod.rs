//! Built-in leaf field types.

mod choice;
mod color;
mod numeric;
mod text;

pub use choice::{CheckboxField, SelectField};
pub use color::ColorField;
pub use numeric::{DateField, NumberField};
pub use text::{
    sanitize_email, sanitize_text, sanitize_textarea, sanitize_url, strip_tags, TextField,
    TextKind,
};
