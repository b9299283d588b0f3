//! In-memory backends for tests and local fixtures.
//!
//! `MemoryStore` understands just enough of the AQL subset the engine
//! emits (`objectType = "..."`, `"Attr" = "..."`, `"Attr" IS NOT EMPTY`,
//! joined with AND) to answer discovery and lookup queries. Failure
//! injection knobs exist so workflow tests can exercise the error paths
//! without a real backend.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use stocktake_core::{
    AttributeDefinition, AttributeInstance, AttributeUpdate, AttributeValue, ObjectType, Record,
    Schema,
};

use crate::error::{IdentityError, StoreError};
use crate::traits::{Account, IdentityStore, QueryPage, RecordStore};

#[derive(Default)]
struct Inner {
    next_id: u64,
    schemas: Vec<Schema>,
    types: Vec<(u64, ObjectType)>,
    definitions: HashMap<u64, Vec<AttributeDefinition>>,
    records: Vec<Record>,
    failing_gets: HashSet<String>,
    failing_deletes: HashSet<String>,
    ignore_updates: bool,
    definition_fetches: usize,
}

/// In-memory `RecordStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_schema(&self, id: u64, name: &str) {
        self.inner.borrow_mut().schemas.push(Schema {
            id,
            name: name.to_string(),
        });
    }

    pub fn add_object_type(&self, schema_id: u64, id: u64, name: &str) {
        self.inner.borrow_mut().types.push((
            schema_id,
            ObjectType {
                id,
                name: name.to_string(),
            },
        ));
    }

    pub fn set_definitions(&self, object_type_id: u64, defs: Vec<AttributeDefinition>) {
        self.inner.borrow_mut().definitions.insert(object_type_id, defs);
    }

    /// Insert a fully-formed record, trusting the caller's ids.
    pub fn insert(&self, record: Record) {
        self.inner.borrow_mut().records.push(record);
    }

    /// Insert a record with a fresh id. The label is taken from a "Name"
    /// attribute when one is present, mirroring how the backend labels
    /// records.
    pub fn seed(
        &self,
        key: &str,
        object_type_id: u64,
        attributes: Vec<AttributeInstance>,
    ) -> Record {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let label = attributes
            .iter()
            .find(|a| a.name.as_deref() == Some("Name"))
            .and_then(|a| a.values.first())
            .map(|v| v.display.clone());
        let record = Record {
            id: inner.next_id.to_string(),
            key: key.to_string(),
            object_type_id,
            label,
            attributes,
        };
        inner.records.push(record.clone());
        record
    }

    /// Peek at the stored copy of a record.
    pub fn record(&self, key: &str) -> Option<Record> {
        self.inner
            .borrow()
            .records
            .iter()
            .find(|r| r.key == key)
            .cloned()
    }

    /// How many times attribute definitions were fetched, across all
    /// object types. Lets tests assert on caching behavior.
    pub fn definition_fetches(&self) -> usize {
        self.inner.borrow().definition_fetches
    }

    /// Make `get_by_key` fail for one key with a backend error.
    pub fn fail_get(&self, key: &str) {
        self.inner.borrow_mut().failing_gets.insert(key.to_string());
    }

    /// Make `delete` fail for one record id.
    pub fn fail_delete(&self, id: &str) {
        self.inner.borrow_mut().failing_deletes.insert(id.to_string());
    }

    /// Accept updates without applying them. Simulates a backend that
    /// acknowledges a write the re-read does not reflect.
    pub fn ignore_updates(&self) {
        self.inner.borrow_mut().ignore_updates = true;
    }

    fn type_name(inner: &Inner, object_type_id: u64) -> Option<String> {
        inner
            .types
            .iter()
            .find(|(_, t)| t.id == object_type_id)
            .map(|(_, t)| t.name.clone())
    }

    fn matches(inner: &Inner, record: &Record, query: &str) -> bool {
        query
            .split(" AND ")
            .all(|clause| Self::clause_matches(inner, record, clause.trim()))
    }

    fn clause_matches(inner: &Inner, record: &Record, clause: &str) -> bool {
        if let Some(rest) = clause.strip_prefix("objectType = ") {
            return match unquote(rest) {
                Some(name) => Self::type_name(inner, record.object_type_id).as_deref()
                    == Some(name.as_str()),
                None => false,
            };
        }
        if let Some(attr) = clause.strip_suffix(" IS NOT EMPTY") {
            return match unquote(attr) {
                Some(attr) => record.has_value(&attr),
                None => false,
            };
        }
        if let Some((attr, value)) = clause.split_once(" = ") {
            if let (Some(attr), Some(value)) = (unquote(attr), unquote(value)) {
                return record
                    .attribute_by_name(&attr)
                    .map(|inst| {
                        inst.values
                            .iter()
                            .any(|v| v.display == value || v.raw == value)
                    })
                    .unwrap_or(false);
            }
        }
        false
    }

    fn materialize(
        names: &HashMap<u64, String>,
        updates: &[AttributeUpdate],
    ) -> Vec<AttributeInstance> {
        updates
            .iter()
            .map(|u| AttributeInstance {
                definition_id: u.attribute_id,
                name: names.get(&u.attribute_id).cloned(),
                values: u
                    .values
                    .iter()
                    .map(|v| AttributeValue::text(v.value.clone()))
                    .collect(),
            })
            .collect()
    }

    fn definition_names(inner: &Inner, object_type_id: u64) -> HashMap<u64, String> {
        inner
            .definitions
            .get(&object_type_id)
            .map(|defs| defs.iter().map(|d| (d.id, d.name.clone())).collect())
            .unwrap_or_default()
    }
}

fn unquote(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix('"')?.strip_suffix('"')?;
    Some(body.replace("\\\"", "\""))
}

impl RecordStore for MemoryStore {
    fn get_by_key(&self, key: &str) -> Result<Record, StoreError> {
        let inner = self.inner.borrow();
        if inner.failing_gets.contains(key) {
            return Err(StoreError::Backend {
                context: "record fetch".to_string(),
                message: format!("injected failure for {key}"),
            });
        }
        inner
            .records
            .iter()
            .find(|r| r.key == key)
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound {
                key: key.to_string(),
            })
    }

    fn find_by_query(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<QueryPage, StoreError> {
        let inner = self.inner.borrow();
        let matched: Vec<Record> = inner
            .records
            .iter()
            .filter(|r| Self::matches(&inner, r, query))
            .cloned()
            .collect();
        let total = matched.len();
        let values = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();
        Ok(QueryPage { values, total })
    }

    fn create(
        &self,
        object_type_id: u64,
        attributes: &[AttributeUpdate],
    ) -> Result<Record, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        let names = Self::definition_names(&inner, object_type_id);
        let instances = Self::materialize(&names, attributes);
        let label = instances
            .iter()
            .find(|a| a.name.as_deref() == Some("Name"))
            .and_then(|a| a.values.first())
            .map(|v| v.display.clone());
        let record = Record {
            id: id.to_string(),
            key: format!("OBJ-{id}"),
            object_type_id,
            label,
            attributes: instances,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    fn update(&self, id: &str, updates: &[AttributeUpdate]) -> Result<Record, StoreError> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let idx = inner
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound {
                key: id.to_string(),
            })?;
        if inner.ignore_updates {
            return Ok(inner.records[idx].clone());
        }
        let names = Self::definition_names(inner, inner.records[idx].object_type_id);
        let record = &mut inner.records[idx];
        for update in updates {
            let values: Vec<AttributeValue> = update
                .values
                .iter()
                .map(|v| AttributeValue::text(v.value.clone()))
                .collect();
            match record
                .attributes
                .iter_mut()
                .find(|a| a.definition_id == update.attribute_id)
            {
                Some(instance) => instance.values = values,
                None => record.attributes.push(AttributeInstance {
                    definition_id: update.attribute_id,
                    name: names.get(&update.attribute_id).cloned(),
                    values,
                }),
            }
        }
        Ok(record.clone())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failing_deletes.contains(id) {
            return Err(StoreError::Backend {
                context: "record delete".to_string(),
                message: format!("injected failure for id {id}"),
            });
        }
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        Ok(inner.records.len() < before)
    }

    fn get_schemas(&self) -> Result<Vec<Schema>, StoreError> {
        Ok(self.inner.borrow().schemas.clone())
    }

    fn get_object_types(&self, schema_id: u64) -> Result<Vec<ObjectType>, StoreError> {
        let inner = self.inner.borrow();
        if !inner.schemas.iter().any(|s| s.id == schema_id) {
            return Err(StoreError::SchemaNotFound {
                schema: schema_id.to_string(),
            });
        }
        Ok(inner
            .types
            .iter()
            .filter(|(sid, _)| *sid == schema_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    fn get_attribute_definitions(
        &self,
        object_type_id: u64,
    ) -> Result<Vec<AttributeDefinition>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.definition_fetches += 1;
        inner
            .definitions
            .get(&object_type_id)
            .cloned()
            .ok_or_else(|| StoreError::ObjectTypeNotFound {
                object_type: object_type_id.to_string(),
            })
    }
}

/// In-memory `IdentityStore`. Seeding two accounts with the same email
/// makes lookups for it ambiguous, as with the real directory.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: RefCell<Vec<Account>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        MemoryIdentity::default()
    }

    pub fn add(&self, account: Account) {
        self.accounts.borrow_mut().push(account);
    }

    pub fn add_user(&self, email: &str, account_id: &str, active: bool) {
        self.add(Account {
            account_id: account_id.to_string(),
            display_name: email.to_string(),
            email: Some(email.to_string()),
            active,
            account_type: None,
        });
    }
}

impl IdentityStore for MemoryIdentity {
    fn find_account_by_email(&self, email: &str) -> Result<Account, IdentityError> {
        let accounts = self.accounts.borrow();
        let matches: Vec<&Account> = accounts
            .iter()
            .filter(|a| {
                a.email
                    .as_deref()
                    .map(|e| e.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .collect();
        match matches.len() {
            0 => Err(IdentityError::AccountNotFound {
                email: email.to_string(),
            }),
            1 => Ok(matches[0].clone()),
            n => Err(IdentityError::AmbiguousAccount {
                email: email.to_string(),
                count: n,
            }),
        }
    }

    fn is_account_active(&self, account_id: &str) -> Result<bool, IdentityError> {
        Ok(self
            .accounts
            .borrow()
            .iter()
            .find(|a| a.account_id == account_id)
            .map(|a| a.active)
            .unwrap_or(false))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
