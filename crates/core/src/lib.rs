//! Core data model for the stocktake inventory toolkit -- records,
//! schemas, attribute definitions and the extraction/update codec.
//!
//! Everything here is plain data with accessor methods; talking to the
//! backing APIs lives in the store traits and their implementations.

mod record;
mod schema;
mod update;

pub use record::{AttributeInstance, AttributeValue, Extracted, Record};
pub use schema::{AttributeDefinition, DefaultType, ObjectType, Schema, StatusValue};
pub use update::{AttributeUpdate, UpdateValue};
