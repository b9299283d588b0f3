//! Wire shapes of the inventory REST surface and their conversions
//! into the core model.
//!
//! The backend speaks camelCase JSON and is loose about id types --
//! numbers in some responses, strings in others -- so ids are parsed
//! leniently. Value conversion keeps both renderings populated: a value
//! missing its display form falls back to the raw form and vice versa,
//! with a status value's name filling in for a missing display.

use serde::{Deserialize, Deserializer, Serialize};

use stocktake_core::{
    AttributeDefinition, AttributeInstance, AttributeUpdate, AttributeValue, DefaultType, Record,
    StatusValue,
};
use stocktake_store::QueryPage;

// ──────────────────────────────────────────────
// Lenient id parsing
// ──────────────────────────────────────────────

fn lenient_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

fn id_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    lenient_u64(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a numeric id, got {value}"))
    })
}

fn opt_id_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => lenient_u64(&value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a numeric id, got {value}"))
        }),
    }
}

// ──────────────────────────────────────────────
// Listings
// ──────────────────────────────────────────────

/// Listing responses arrive either as a bare array or wrapped in a
/// `values` envelope, depending on the endpoint and deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(default = "Vec::new")]
        values: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped { values } => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SchemaDto {
    #[serde(deserialize_with = "id_u64")]
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ObjectTypeDto {
    #[serde(deserialize_with = "id_u64")]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

// ──────────────────────────────────────────────
// Attribute definitions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttributeDefDto {
    #[serde(deserialize_with = "id_u64")]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Backend numeric type code.
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    #[serde(default)]
    pub default_type: Option<DefaultTypeDto>,
    #[serde(default)]
    pub type_value: Option<TypeValueDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DefaultTypeDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TypeValueDto {
    #[serde(default)]
    pub status_type_values: Vec<StatusValueDto>,
    /// Older deployments report the options under this field instead.
    #[serde(default)]
    pub status_values: Vec<StatusValueDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusValueDto {
    #[serde(deserialize_with = "id_u64")]
    pub id: u64,
    pub name: String,
}

impl AttributeDefDto {
    pub(crate) fn into_definition(self) -> AttributeDefinition {
        let status_values = match self.type_value {
            Some(tv) if !tv.status_type_values.is_empty() => tv.status_type_values,
            Some(tv) => tv.status_values,
            None => Vec::new(),
        };
        AttributeDefinition {
            id: self.id,
            name: self.name.unwrap_or_default(),
            kind: self.kind,
            default_type: self
                .default_type
                .map(|dt| DefaultType { id: dt.id, name: dt.name }),
            status_values: status_values
                .into_iter()
                .map(|sv| StatusValue { id: sv.id, name: sv.name })
                .collect(),
        }
    }
}

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObjectEntry {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub object_key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub object_type: Option<ObjectTypeDto>,
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttributeEntry {
    #[serde(default, deserialize_with = "opt_id_u64")]
    pub object_type_attribute_id: Option<u64>,
    /// Full definition, embedded on complete-record responses. Query
    /// responses carry only the id above, which is why instance names
    /// are optional in the core model.
    #[serde(default)]
    pub object_type_attribute: Option<AttributeDefDto>,
    #[serde(default)]
    pub object_attribute_values: Vec<ValueEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueEntry {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default)]
    pub search_value: Option<String>,
    #[serde(default)]
    pub status: Option<StatusRefDto>,
    #[serde(default)]
    pub referenced_object: Option<ReferencedObjectDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusRefDto {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReferencedObjectDto {
    #[serde(default)]
    pub object_key: Option<String>,
}

fn scalar_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ValueEntry {
    /// Convert one wire value, or `None` when the entry carries nothing
    /// usable in either rendering.
    fn into_value(self) -> Option<AttributeValue> {
        let ValueEntry {
            value,
            display_value,
            search_value,
            status,
            referenced_object,
        } = self;

        let raw = value.as_ref().map(scalar_string);
        let display = display_value.or_else(|| status.and_then(|s| s.name));

        let (raw, display) = match (raw, display) {
            (Some(raw), Some(display)) => (raw, display),
            (Some(raw), None) => (raw.clone(), raw),
            (None, Some(display)) => (display.clone(), display),
            (None, None) => return None,
        };

        Some(AttributeValue {
            raw,
            display,
            search: search_value,
            referenced_key: referenced_object.and_then(|r| r.object_key),
        })
    }
}

impl AttributeEntry {
    /// Instances with no resolvable definition id are dropped; the core
    /// model addresses attributes by id.
    fn into_instance(self) -> Option<AttributeInstance> {
        let AttributeEntry {
            object_type_attribute_id,
            object_type_attribute,
            object_attribute_values,
        } = self;

        let (embedded_id, name) = match object_type_attribute {
            Some(def) => (Some(def.id), def.name),
            None => (None, None),
        };
        let definition_id = object_type_attribute_id.or(embedded_id)?;

        Some(AttributeInstance {
            definition_id,
            name,
            values: object_attribute_values
                .into_iter()
                .filter_map(ValueEntry::into_value)
                .collect(),
        })
    }
}

impl ObjectEntry {
    pub(crate) fn into_record(self) -> Record {
        let ObjectEntry {
            id,
            object_key,
            label,
            object_type,
            attributes,
        } = self;
        Record {
            id,
            key: object_key,
            // Update responses sometimes omit the owning type; zero
            // marks it unknown.
            object_type_id: object_type.map(|t| t.id).unwrap_or(0),
            label,
            attributes: attributes
                .into_iter()
                .filter_map(AttributeEntry::into_instance)
                .collect(),
        }
    }
}

// ──────────────────────────────────────────────
// Query pages
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub object_entries: Vec<ObjectEntry>,
    /// Older deployments report entries under this field instead.
    #[serde(default)]
    pub values: Vec<ObjectEntry>,
    #[serde(default)]
    pub total_filter_count: Option<usize>,
}

impl QueryResponse {
    pub(crate) fn into_page(self) -> QueryPage {
        let entries = if self.object_entries.is_empty() {
            self.values
        } else {
            self.object_entries
        };
        let total = self.total_filter_count.unwrap_or(entries.len());
        QueryPage {
            values: entries.into_iter().map(ObjectEntry::into_record).collect(),
            total,
        }
    }
}

// ──────────────────────────────────────────────
// Outbound payloads
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest<'a> {
    pub ql_query: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRequest {
    /// The backend insists on a string here even though ids are numeric
    /// everywhere else.
    pub object_type_id: String,
    pub attributes: Vec<UpdateEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRequest {
    pub attributes: Vec<UpdateEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateEntry {
    pub object_type_attribute_id: u64,
    pub object_attribute_values: Vec<UpdateValueEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateValueEntry {
    pub value: String,
}

pub(crate) fn update_entries(updates: &[AttributeUpdate]) -> Vec<UpdateEntry> {
    updates
        .iter()
        .map(|update| UpdateEntry {
            object_type_attribute_id: update.attribute_id,
            object_attribute_values: update
                .values
                .iter()
                .map(|v| UpdateValueEntry {
                    value: v.value.clone(),
                })
                .collect(),
        })
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
