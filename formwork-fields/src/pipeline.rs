//! The per-field sanitize → validate pipeline run at save time.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::field::{Field, FieldKind};

/// What the save orchestration should do with one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// Non-repeater containers never persist
    Skipped,
    /// Nothing was submitted for the field
    Delete,
    /// Sanitized and valid
    Save(Value),
    /// Sanitized but invalid; the value is dropped
    Rejected(Vec<String>),
}

/// Run one field through the pipeline.
///
/// `raw` is the submitted value, `None` when the payload has no entry for
/// the field.
pub fn process_field(field: &dyn Field, raw: Option<&Value>) -> FieldOutcome {
    if let FieldKind::Container(_) = field.kind() {
        return FieldOutcome::Skipped;
    }
    let Some(raw) = raw else {
        return FieldOutcome::Delete;
    };
    let cleaned = field.sanitize(raw);
    let result = field.validate(&cleaned);
    if result.valid {
        FieldOutcome::Save(cleaned)
    } else {
        FieldOutcome::Rejected(result.errors)
    }
}

/// Summary of one save pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveReport {
    /// Fields whose value was written
    pub saved: Vec<String>,
    /// Fields deleted because nothing was submitted
    pub deleted: Vec<String>,
    /// Validation errors by field name; these fields were left untouched
    pub errors: IndexMap<String, Vec<String>>,
}

impl SaveReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors of one field, if it was rejected.
    pub fn errors_for(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldTypeRegistry;
    use crate::spec::FieldSpec;
    use serde_json::json;

    fn field(spec: Value) -> Box<dyn Field> {
        FieldTypeRegistry::with_defaults()
            .instantiate(&FieldSpec::from_value(spec))
            .unwrap()
    }

    #[test]
    fn containers_are_skipped() {
        let group = field(json!({"name": "g", "type": "group", "fields": []}));
        assert_eq!(process_field(group.as_ref(), Some(&json!("x"))), FieldOutcome::Skipped);
        assert_eq!(process_field(group.as_ref(), None), FieldOutcome::Skipped);
    }

    #[test]
    fn missing_value_is_a_delete() {
        let title = field(json!({"name": "title", "type": "text"}));
        assert_eq!(process_field(title.as_ref(), None), FieldOutcome::Delete);
    }

    #[test]
    fn valid_value_is_saved_sanitized() {
        let title = field(json!({"name": "title", "type": "text"}));
        assert_eq!(
            process_field(title.as_ref(), Some(&json!("  <b>Hi</b>  there "))),
            FieldOutcome::Save(json!("Hi there"))
        );
    }

    #[test]
    fn invalid_value_is_rejected_with_errors() {
        let email = field(json!({"name": "email", "type": "email", "required": true}));
        assert_eq!(
            process_field(email.as_ref(), Some(&json!(""))),
            FieldOutcome::Rejected(vec!["This field is required.".to_string()])
        );
    }

    #[test]
    fn repeaters_go_through_the_pipeline() {
        let links = field(json!({
            "name": "links",
            "type": "repeater",
            "fields": [{"name": "url", "type": "url"}]
        }));
        assert_eq!(
            process_field(links.as_ref(), Some(&json!([{"url": ""}, {"url": "a.example"}]))),
            FieldOutcome::Save(json!([{"url": "http://a.example"}]))
        );
    }

    #[test]
    fn report_validity() {
        let mut report = SaveReport::default();
        assert!(report.is_valid());
        report.errors.insert("age".into(), vec!["Must be a valid number.".into()]);
        assert!(!report.is_valid());
        assert_eq!(report.errors_for("age").unwrap().len(), 1);
    }
}
