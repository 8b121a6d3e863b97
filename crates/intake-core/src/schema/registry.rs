//! The closed field registry and the single guarded write path.

use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use super::field::{FieldValue, SchemaField};
use super::FieldType;

/// Errors raised while constructing a registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate field identifier: {0}")]
    DuplicateField(String),

    #[error("Enum field {0} declares no options")]
    EmptyEnum(String),

    #[error("Registry declares no fields")]
    Empty,
}

/// A write was rejected by the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldPathError {
    #[error("Unknown field path: {path}")]
    UnknownPath { path: String },

    #[error("Type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Field {path} is not the field under collection ({expected})")]
    NotCurrentField { path: String, expected: String },
}

/// Canonical, immutable set of declared fields.
///
/// Order of declaration is the canonical order: the order the interview
/// visits fields and the order review renders them.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: Vec<SchemaField>,
}

impl SchemaRegistry {
    /// Build a registry from declared fields in canonical order.
    pub fn new(fields: Vec<SchemaField>) -> Result<Self, RegistryError> {
        if fields.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.id.as_str()) {
                return Err(RegistryError::DuplicateField(field.id.clone()));
            }
            if let FieldType::Enum { options } = &field.field_type {
                if options.is_empty() {
                    return Err(RegistryError::EmptyEnum(field.id.clone()));
                }
            }
        }

        Ok(Self { fields })
    }

    /// Fields in canonical order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by identifier.
    pub fn get(&self, path: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.id == path)
    }

    /// Canonical index of a field.
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == path)
    }

    /// Field at a canonical index.
    pub fn at(&self, index: usize) -> Option<&SchemaField> {
        self.fields.get(index)
    }

    /// Identifiers of all required fields, in canonical order.
    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Check a path/value pair without mutating anything.
    pub fn coerce(&self, path: &str, value: &JsonValue) -> Result<FieldValue, FieldPathError> {
        let field = self.get(path).ok_or_else(|| FieldPathError::UnknownPath {
            path: path.to_string(),
        })?;

        FieldValue::from_json(&field.field_type, value).ok_or_else(|| {
            FieldPathError::TypeMismatch {
                path: path.to_string(),
                expected: field.field_type.to_string(),
                actual: json_type_name(value).to_string(),
            }
        })
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Collected application data, keyed by declared field identifier.
///
/// The only mutation is [`ApplicationData::write`], which validates path
/// and type before committing.
#[derive(Debug, Clone)]
pub struct ApplicationData {
    registry: Arc<SchemaRegistry>,
    values: BTreeMap<String, FieldValue>,
}

impl ApplicationData {
    /// Empty data bound to a registry.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            values: BTreeMap::new(),
        }
    }

    /// Write a value. Fails closed: returns false and leaves data unchanged
    /// if the path is undeclared or the value does not match its type.
    pub fn write(&mut self, path: &str, value: &JsonValue) -> bool {
        match self.registry.coerce(path, value) {
            Ok(typed) => {
                tracing::debug!(field = %path, "Schema write committed");
                self.values.insert(path.to_string(), typed);
                true
            }
            Err(e) => {
                tracing::debug!(field = %path, error = %e, "Schema write rejected");
                false
            }
        }
    }

    /// Current value for a field.
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.values.get(path)
    }

    /// Number of fields holding a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The registry this data is bound to.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{catalog, FieldTag};
    use proptest::prelude::*;
    use serde_json::json;

    fn field(id: &str, field_type: FieldType) -> SchemaField {
        SchemaField {
            id: id.to_string(),
            label: id.to_string(),
            section: "test".to_string(),
            prompt: format!("What is {}?", id),
            field_type,
            required: false,
            tag: FieldTag::Simple,
        }
    }

    fn data() -> ApplicationData {
        ApplicationData::new(Arc::new(catalog::innovation_voucher()))
    }

    #[test]
    fn test_valid_write_commits() {
        let mut data = data();
        assert!(data.write("company.legal_name", &json!("Test Ltd")));
        assert_eq!(
            data.get("company.legal_name"),
            Some(&FieldValue::Text("Test Ltd".to_string()))
        );
    }

    #[test]
    fn test_unknown_path_rejected() {
        let mut data = data();
        assert!(!data.write("company.invented_field", &json!("Bad Data")));
        assert!(!data.write("random.path.here", &json!("Bad Data")));
        assert!(data.is_empty());
    }

    #[test]
    fn test_object_on_text_field_rejected() {
        let mut data = data();
        assert!(!data.write("company.legal_name", &json!({"unexpected": "object"})));
        assert!(data.get("company.legal_name").is_none());
    }

    #[test]
    fn test_rejected_write_keeps_previous_value() {
        let mut data = data();
        assert!(data.write("company.employees.full_time", &json!(12)));
        assert!(!data.write("company.employees.full_time", &json!("twelve")));
        assert_eq!(
            data.get("company.employees.full_time"),
            Some(&FieldValue::Number(12.0))
        );
    }

    #[test]
    fn test_coerce_reports_mismatch_detail() {
        let registry = catalog::innovation_voucher();
        let err = registry
            .coerce("project.deliverables", &json!("a report"))
            .unwrap_err();
        assert_eq!(
            err,
            FieldPathError::TypeMismatch {
                path: "project.deliverables".to_string(),
                expected: "text_list".to_string(),
                actual: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = SchemaRegistry::new(vec![
            field("a.one", FieldType::Text),
            field("a.one", FieldType::Number),
        ]);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateField("a.one".to_string())
        );
    }

    #[test]
    fn test_empty_enum_rejected() {
        let result = SchemaRegistry::new(vec![field(
            "a.kind",
            FieldType::Enum { options: vec![] },
        )]);
        assert!(matches!(result, Err(RegistryError::EmptyEnum(_))));
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert_eq!(SchemaRegistry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }

    fn arb_json() -> impl Strategy<Value = JsonValue> {
        prop_oneof![
            Just(JsonValue::Null),
            any::<bool>().prop_map(JsonValue::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z ]{0,12}".prop_map(JsonValue::String),
            prop::collection::vec("[a-z]{1,6}", 0..3).prop_map(|v| json!(v)),
            Just(json!({"nested": "object"})),
        ]
    }

    proptest! {
        #[test]
        fn prop_undeclared_paths_never_mutate(
            path in "[a-z_]{1,10}(\\.[a-z_]{1,10}){0,3}",
            value in arb_json(),
        ) {
            let mut data = data();
            let declared = data.registry().get(&path).is_some();
            prop_assume!(!declared);
            prop_assert!(!data.write(&path, &value));
            prop_assert!(data.is_empty());
        }

        #[test]
        fn prop_write_succeeds_iff_type_matches(
            index in 0usize..27,
            value in arb_json(),
        ) {
            let mut data = data();
            let field = data.registry().at(index).cloned().unwrap();
            let matches = FieldValue::from_json(&field.field_type, &value).is_some();
            let written = data.write(&field.id, &value);
            prop_assert_eq!(written, matches);
            prop_assert_eq!(data.get(&field.id).is_some(), matches);
        }
    }
}
