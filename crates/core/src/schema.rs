//! Schema-side model: schemas, object types and attribute definitions.

use serde::{Deserialize, Serialize};

/// A top-level inventory schema (a workspace groups several).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub id: u64,
    pub name: String,
}

/// A category of records within a schema, e.g. "Laptops".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: u64,
    pub name: String,
}

/// Declared value type of an attribute definition, e.g. Text or Status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultType {
    pub id: i64,
    pub name: String,
}

/// One allowed value of a Status-typed attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusValue {
    pub id: u64,
    pub name: String,
}

/// Schema-level description of one named field on an object type.
/// Read-only to this toolkit; cached per object type for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: u64,
    /// Unique within the owning object type.
    pub name: String,
    /// Backend numeric type code. Compared during schema mapping to
    /// flag cross-type moves that may not coerce cleanly.
    pub kind: Option<i64>,
    pub default_type: Option<DefaultType>,
    /// Allowed values for Status-typed definitions, empty otherwise.
    pub status_values: Vec<StatusValue>,
}

impl AttributeDefinition {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        AttributeDefinition {
            id,
            name: name.into(),
            kind: None,
            default_type: None,
            status_values: Vec::new(),
        }
    }

    /// True when the declared default type is Status, matched
    /// case-insensitively.
    pub fn is_status(&self) -> bool {
        self.default_type
            .as_ref()
            .map(|dt| dt.name.eq_ignore_ascii_case("status"))
            .unwrap_or(false)
    }

    /// Human label of the declared type, used in mapping warnings.
    pub fn type_label(&self) -> String {
        match (&self.default_type, self.kind) {
            (Some(dt), _) => dt.name.clone(),
            (None, Some(kind)) => format!("type {kind}"),
            (None, None) => "unknown".to_string(),
        }
    }
}
