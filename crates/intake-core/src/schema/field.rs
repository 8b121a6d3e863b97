//! Field declarations and typed field values.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Free text
    Text,

    /// Any JSON number
    Number,

    /// One of a closed set of options
    Enum { options: Vec<String> },

    /// Yes / no
    Boolean,

    /// Ordered list of text items
    TextList,
}

impl FieldType {
    /// Short name used in error messages and listings.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Enum { .. } => "enum",
            FieldType::Boolean => "boolean",
            FieldType::TextList => "text_list",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Enum { options } => write!(f, "enum({})", options.join("|")),
            other => f.write_str(other.name()),
        }
    }
}

/// Classification used by the low-confidence advancement gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    /// Content quality materially affects downstream evaluation
    QualityCritical,

    /// Everything else
    Simple,
}

/// A single declared field of the application schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Dotted identifier (e.g., "company.legal_name")
    pub id: String,

    /// Human-readable label for review rendering
    pub label: String,

    /// Section the field belongs to (e.g., "company")
    pub section: String,

    /// Question template used to prompt for this field
    pub prompt: String,

    /// Declared value type
    pub field_type: FieldType,

    /// Required fields cannot be skipped
    pub required: bool,

    /// Quality-critical or simple
    pub tag: FieldTag,
}

impl SchemaField {
    /// Whether the low-confidence gate applies to this field.
    pub fn is_quality_critical(&self) -> bool {
        self.tag == FieldTag::QualityCritical
    }
}

/// A typed value stored against a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    TextList(Vec<String>),
}

impl FieldValue {
    /// Coerce a raw JSON value into the declared type.
    ///
    /// Returns `None` on any mismatch. No lenient conversions: a number is
    /// never accepted for a text field and a bare string never for a list.
    pub fn from_json(field_type: &FieldType, value: &JsonValue) -> Option<Self> {
        match (field_type, value) {
            (FieldType::Text, JsonValue::String(s)) => Some(FieldValue::Text(s.clone())),
            (FieldType::Number, JsonValue::Number(n)) => n.as_f64().map(FieldValue::Number),
            (FieldType::Enum { options }, JsonValue::String(s)) => options
                .iter()
                .any(|o| o == s)
                .then(|| FieldValue::Text(s.clone())),
            (FieldType::Boolean, JsonValue::Bool(b)) => Some(FieldValue::Boolean(*b)),
            (FieldType::TextList, JsonValue::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::TextList),
            _ => None,
        }
    }

    /// Render the value for display.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Boolean(true) => "Yes".to_string(),
            FieldValue::Boolean(false) => "No".to_string(),
            FieldValue::TextList(items) => items.join(", "),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
