//! Inventory record model and attribute extraction.
//!
//! Records arrive from the backend as attribute lists keyed by numeric
//! definition id. Extraction always works on display values (the human
//! rendering) because the backend renders reference and status attributes
//! differently from their raw identifiers.

use serde::{Deserialize, Serialize};

/// One managed inventory item (an asset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Opaque backend identifier, assigned at creation.
    pub id: String,
    /// Human-readable identifier, e.g. `HW-0003`. Unique, immutable.
    pub key: String,
    pub object_type_id: u64,
    /// Backend-rendered display name of the record, when provided.
    pub label: Option<String>,
    /// Ordered attribute instances. Order is preserved from the backend.
    pub attributes: Vec<AttributeInstance>,
}

/// One attribute slot on a record, carrying zero or more values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeInstance {
    pub definition_id: u64,
    /// Definition name. Some query responses carry only the id, so this
    /// can be absent; extraction by id exists for exactly that case.
    pub name: Option<String>,
    pub values: Vec<AttributeValue>,
}

/// A single attribute value as stored on a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Raw backend value (account id, status id, referenced object id, ...).
    pub raw: String,
    /// Human rendering of the value.
    pub display: String,
    /// Search-friendly rendering, present on some reference attributes.
    pub search: Option<String>,
    /// Key of the referenced record, for reference-typed attributes.
    pub referenced_key: Option<String>,
}

impl AttributeValue {
    pub fn new(raw: impl Into<String>, display: impl Into<String>) -> Self {
        AttributeValue {
            raw: raw.into(),
            display: display.into(),
            search: None,
            referenced_key: None,
        }
    }

    /// Value with identical raw and display form, the common case for
    /// text attributes.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        AttributeValue::new(value.clone(), value)
    }
}

/// Result of extracting an attribute: scalar for single-valued
/// attributes, list for multi-valued ones. Absence is `None` at the
/// call site, never a variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Single(String),
    Multi(Vec<String>),
}

impl Extracted {
    /// The scalar value, if this extraction produced exactly one.
    pub fn scalar(&self) -> Option<&str> {
        match self {
            Extracted::Single(v) => Some(v),
            Extracted::Multi(_) => None,
        }
    }

    /// First value in encounter order. Multi extractions always hold at
    /// least two values, so this never allocates or fails.
    pub fn primary(&self) -> &str {
        match self {
            Extracted::Single(v) => v,
            Extracted::Multi(vs) => &vs[0],
        }
    }

    /// Single line suitable for logs and result payloads.
    pub fn to_display(&self) -> String {
        match self {
            Extracted::Single(v) => v.clone(),
            Extracted::Multi(vs) => vs.join(", "),
        }
    }
}

impl AttributeInstance {
    pub fn new(definition_id: u64, name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        AttributeInstance {
            definition_id,
            name: Some(name.into()),
            values,
        }
    }

    /// Display values of this instance: `None` when the instance holds no
    /// values, scalar when it holds exactly one, list otherwise.
    pub fn extracted(&self) -> Option<Extracted> {
        match self.values.len() {
            0 => None,
            1 => Some(Extracted::Single(self.values[0].display.clone())),
            _ => Some(Extracted::Multi(
                self.values.iter().map(|v| v.display.clone()).collect(),
            )),
        }
    }
}

impl Record {
    pub fn attribute_by_name(&self, name: &str) -> Option<&AttributeInstance> {
        self.attributes
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
    }

    pub fn attribute_by_id(&self, definition_id: u64) -> Option<&AttributeInstance> {
        self.attributes
            .iter()
            .find(|a| a.definition_id == definition_id)
    }

    /// Extract an attribute's display value(s) by definition name.
    /// Absent attributes and attributes with zero values both yield
    /// `None`; absence is normal, never an error.
    pub fn value_by_name(&self, name: &str) -> Option<Extracted> {
        self.attribute_by_name(name).and_then(|a| a.extracted())
    }

    /// Extract by numeric definition id, for responses that omit names.
    pub fn value_by_id(&self, definition_id: u64) -> Option<Extracted> {
        self.attribute_by_id(definition_id).and_then(|a| a.extracted())
    }

    /// True when the named attribute exists and holds at least one value.
    pub fn has_value(&self, name: &str) -> bool {
        self.value_by_name(name).is_some()
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
