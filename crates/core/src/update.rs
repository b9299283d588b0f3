//! Outbound attribute updates.

use serde::{Deserialize, Serialize};

/// One value entry inside an update payload. The backend accepts raw
/// string forms and coerces them against the definition's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateValue {
    pub value: String,
}

/// An update to a single attribute of a record, pairing a definition id
/// with replacement values. Updates replace the attribute's full value
/// list; they never append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub attribute_id: u64,
    pub values: Vec<UpdateValue>,
}

impl AttributeUpdate {
    /// The common single-value update, with the value's string form.
    pub fn single(attribute_id: u64, value: impl ToString) -> Self {
        AttributeUpdate {
            attribute_id,
            values: vec![UpdateValue {
                value: value.to_string(),
            }],
        }
    }

    pub fn with_values(attribute_id: u64, values: Vec<String>) -> Self {
        AttributeUpdate {
            attribute_id,
            values: values.into_iter().map(|value| UpdateValue { value }).collect(),
        }
    }
}
