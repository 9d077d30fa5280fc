//! Render-pass state and small markup helpers.
//!
//! Markup is an opaque string for the host to embed. The only shared state
//! during a pass is the set of one-time markers in [`RenderContext`].

use std::collections::HashSet;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::base::FieldBase;
use crate::spec::ContextId;

/// State threaded through one render pass for one context.
///
/// Carries the "already emitted" markers that keep shared assets (repeater
/// and tab scripts) from being written twice in the same pass.
#[derive(Debug, Clone)]
pub struct RenderContext {
    context: Option<ContextId>,
    emitted: HashSet<String>,
}

impl RenderContext {
    pub fn new(context: impl Into<ContextId>) -> Self {
        Self {
            context: Some(context.into()),
            emitted: HashSet::new(),
        }
    }

    /// A pass not bound to any context (ad-hoc rendering, tests).
    pub fn detached() -> Self {
        Self {
            context: None,
            emitted: HashSet::new(),
        }
    }

    pub fn context(&self) -> Option<&ContextId> {
        self.context.as_ref()
    }

    /// Returns `true` the first time `marker` is seen in this pass.
    pub fn emit_once(&mut self, marker: &str) -> bool {
        self.emitted.insert(marker.to_string())
    }

    pub fn was_emitted(&self, marker: &str) -> bool {
        self.emitted.contains(marker)
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::detached()
    }
}

pub fn attr(value: &str) -> String {
    encode_double_quoted_attribute(value).into_owned()
}

pub fn text(value: &str) -> String {
    encode_text(value).into_owned()
}

/// Wrap a control with the field's label and description.
pub fn wrap_field(base: &FieldBase, control: &str) -> String {
    let mut classes = format!("formwork-field formwork-field-{}", base.field_type());
    if let Some(extra) = base.css_class() {
        classes.push(' ');
        classes.push_str(extra);
    }
    let required = if base.is_required() {
        " <span class=\"required\">*</span>"
    } else {
        ""
    };
    let description = base
        .description()
        .map(|d| format!("<p class=\"description\">{}</p>", text(d)))
        .unwrap_or_default();
    format!(
        "<div class=\"{}\"><label for=\"{}\">{}{}</label>{}{}</div>",
        attr(&classes),
        attr(&base.html_id()),
        text(&base.label()),
        required,
        control,
        description
    )
}

/// Common `name`, `id` and `required` attributes for an input.
pub fn common_attrs(base: &FieldBase) -> String {
    let mut attrs = format!(
        " name=\"{}\" id=\"{}\"",
        attr(base.name()),
        attr(&base.html_id())
    );
    if let Some(placeholder) = base.get_str("placeholder") {
        attrs.push_str(&format!(" placeholder=\"{}\"", attr(placeholder)));
    }
    if base.is_required() {
        attrs.push_str(" required");
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn emit_once_is_idempotent() {
        let mut ctx = RenderContext::new("settings");
        assert!(ctx.emit_once("repeater-script"));
        assert!(!ctx.emit_once("repeater-script"));
        assert!(ctx.was_emitted("repeater-script"));
    }

    #[test]
    fn markers_do_not_leak_between_contexts() {
        let mut first = RenderContext::new(1u64);
        let second = RenderContext::new(2u64);
        first.emit_once("tabs-script");
        assert!(!second.was_emitted("tabs-script"));
    }

    #[test]
    fn wrap_field_escapes_label_and_description() {
        let config = json!({"label": "<b>Name</b>", "description": "a & b", "required": true});
        let base = FieldBase::new("name", "text", config.as_object().cloned().unwrap());
        let html = wrap_field(&base, "<input>");
        assert!(html.contains("&lt;b&gt;Name&lt;/b&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("class=\"required\""));
    }

    #[test]
    fn common_attrs_include_name_and_id() {
        let base = FieldBase::new("rows[0][title]", "text", Map::new());
        let attrs = common_attrs(&base);
        assert!(attrs.contains("name=\"rows[0][title]\""));
        assert!(attrs.contains("id=\"rows_0_title\""));
    }
}
