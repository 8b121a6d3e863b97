//! Schema registry: the closed set of fields an interview may fill.
//!
//! Fields are declared once at startup and never change. Data is written
//! only through [`ApplicationData::write`], which rejects undeclared paths
//! and mistyped values without mutating anything.

pub mod catalog;
mod field;
mod registry;

pub use field::{FieldTag, FieldType, FieldValue, SchemaField};
pub use registry::{ApplicationData, FieldPathError, RegistryError, SchemaRegistry};
