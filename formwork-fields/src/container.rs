//! Container fields: group, tabs and metabox.
//!
//! Containers own nested specs but never a value of their own. Their
//! `sanitize` always yields an empty collection and their `validate` always
//! passes; the nested leaves are saved under their own names.

use serde_json::Value;
use tracing::warn;

use crate::base::FieldBase;
use crate::field::{Field, FieldKind};
use crate::registry::FieldTypeRegistry;
use crate::render::{attr, text, RenderContext};
use crate::spec::FieldSpec;
use crate::validation::ValidationResult;

/// Render each nested spec with its slice of `values`.
///
/// Leaves and repeaters get `values[name]`; nested containers get the whole
/// object since their descendants are keyed by their own names.
pub(crate) fn render_nested(
    types: &FieldTypeRegistry,
    specs: &[FieldSpec],
    values: &Value,
    ctx: &mut RenderContext,
) -> String {
    let mut html = String::new();
    for spec in specs {
        let child = match types.instantiate(spec) {
            Ok(child) => child,
            Err(e) => {
                warn!(%e, "skipping nested field while rendering");
                continue;
            }
        };
        let value = match child.kind() {
            FieldKind::Container(_) => values.clone(),
            FieldKind::Leaf | FieldKind::Repeater(_) => {
                values.get(child.name()).cloned().unwrap_or(Value::Null)
            }
        };
        html.push_str(&child.render(&value, ctx));
    }
    html
}

fn heading(base: &FieldBase, tag: &str, title: &str) -> String {
    let description = base
        .description()
        .map(|d| format!("<p class=\"description\">{}</p>", text(d)))
        .unwrap_or_default();
    format!("<{tag} class=\"formwork-heading\">{}</{tag}>{description}", text(title))
}

fn container_class(base: &FieldBase, kind: &str) -> String {
    match base.css_class() {
        Some(extra) => attr(&format!("formwork-{kind} {extra}")),
        None => format!("formwork-{kind}"),
    }
}

/// A plain visual grouping of fields (`fields` key).
#[derive(Debug, Clone)]
pub struct GroupField {
    base: FieldBase,
    types: FieldTypeRegistry,
    specs: Vec<FieldSpec>,
}

impl GroupField {
    pub fn new(base: FieldBase, types: FieldTypeRegistry) -> Self {
        let specs = FieldSpec::specs_under(base.config(), "fields");
        Self { base, types, specs }
    }
}

impl Field for GroupField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn kind(&self) -> FieldKind<'_> {
        FieldKind::Container(&self.specs)
    }

    fn render(&self, value: &Value, ctx: &mut RenderContext) -> String {
        format!(
            "<div class=\"{}\" id=\"{}\">{}{}</div>",
            container_class(&self.base, "group"),
            attr(&self.base.html_id()),
            heading(&self.base, "h3", &self.base.label()),
            render_nested(&self.types, &self.specs, value, ctx)
        )
    }

    fn sanitize(&self, _raw: &Value) -> Value {
        Value::Array(Vec::new())
    }

    fn validate(&self, _value: &Value) -> ValidationResult {
        ValidationResult::ok()
    }
}

/// One tab of a [`TabsField`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub id: String,
    pub label: String,
    pub specs: Vec<FieldSpec>,
}

/// Fields split across tabs (`tabs: [{id, label, fields}]`).
#[derive(Debug, Clone)]
pub struct TabsField {
    base: FieldBase,
    types: FieldTypeRegistry,
    tabs: Vec<Tab>,
    specs: Vec<FieldSpec>,
}

impl TabsField {
    pub fn new(base: FieldBase, types: FieldTypeRegistry) -> Self {
        let tabs: Vec<Tab> = match base.get("tabs") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(position, item)| {
                    let tab = item.as_object()?;
                    let id = tab
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("tab-{}", position + 1));
                    let label = tab
                        .get("label")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| crate::base::humanize(&id));
                    Some(Tab {
                        id,
                        label,
                        specs: FieldSpec::specs_under(tab, "fields"),
                    })
                })
                .collect(),
            _ => Vec::new(),
        };
        let specs = tabs.iter().flat_map(|tab| tab.specs.iter().cloned()).collect();
        Self {
            base,
            types,
            tabs,
            specs,
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }
}

impl Field for TabsField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn kind(&self) -> FieldKind<'_> {
        FieldKind::Container(&self.specs)
    }

    fn render(&self, value: &Value, ctx: &mut RenderContext) -> String {
        let id = self.base.html_id();
        let mut nav = String::from("<ul class=\"formwork-tab-nav\" role=\"tablist\">");
        let mut panels = String::new();
        for (position, tab) in self.tabs.iter().enumerate() {
            let panel_id = attr(&format!("{id}-{}", tab.id));
            let active = if position == 0 { " active" } else { "" };
            nav.push_str(&format!(
                "<li class=\"formwork-tab{active}\"><a href=\"#{panel_id}\" role=\"tab\">{}</a></li>",
                text(&tab.label)
            ));
            let hidden = if position == 0 { "" } else { " hidden" };
            panels.push_str(&format!(
                "<div class=\"formwork-tab-panel{active}\" id=\"{panel_id}\" role=\"tabpanel\"{hidden}>{}</div>",
                render_nested(&self.types, &tab.specs, value, ctx)
            ));
        }
        nav.push_str("</ul>");

        let script = if ctx.emit_once("formwork-tabs") {
            "<script data-formwork-asset=\"tabs\"></script>"
        } else {
            ""
        };
        format!(
            "<div class=\"{}\" id=\"{}\">{nav}{panels}{script}</div>",
            container_class(&self.base, "tabs"),
            attr(&id)
        )
    }

    fn sanitize(&self, _raw: &Value) -> Value {
        Value::Array(Vec::new())
    }

    fn validate(&self, _value: &Value) -> ValidationResult {
        ValidationResult::ok()
    }
}

/// A titled box wrapping fields, placed by the host (`context`, `priority`).
#[derive(Debug, Clone)]
pub struct MetaboxField {
    base: FieldBase,
    types: FieldTypeRegistry,
    specs: Vec<FieldSpec>,
}

impl MetaboxField {
    pub fn new(base: FieldBase, types: FieldTypeRegistry) -> Self {
        let specs = FieldSpec::specs_under(base.config(), "fields");
        Self { base, types, specs }
    }

    pub fn title(&self) -> String {
        self.base
            .get_str("title")
            .map(str::to_string)
            .unwrap_or_else(|| self.base.label())
    }

    /// Placement hint for the host: `normal`, `side` or `advanced`.
    pub fn placement(&self) -> &str {
        self.base.get_str("context").unwrap_or("normal")
    }

    pub fn priority(&self) -> &str {
        self.base.get_str("priority").unwrap_or("default")
    }
}

impl Field for MetaboxField {
    fn base(&self) -> &FieldBase {
        &self.base
    }

    fn kind(&self) -> FieldKind<'_> {
        FieldKind::Container(&self.specs)
    }

    fn render(&self, value: &Value, ctx: &mut RenderContext) -> String {
        format!(
            "<div class=\"{}\" id=\"{}\" data-context=\"{}\" data-priority=\"{}\">{}<div class=\"formwork-metabox-inside\">{}</div></div>",
            container_class(&self.base, "metabox"),
            attr(&self.base.html_id()),
            attr(self.placement()),
            attr(self.priority()),
            heading(&self.base, "h2", &self.title()),
            render_nested(&self.types, &self.specs, value, ctx)
        )
    }

    fn sanitize(&self, _raw: &Value) -> Value {
        Value::Array(Vec::new())
    }

    fn validate(&self, _value: &Value) -> ValidationResult {
        ValidationResult::ok()
    }
}
