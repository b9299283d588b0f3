//! Name resolution: human-facing status, model and supplier names to
//! the identifiers the backend wants, plus the cached catalogues behind
//! the list commands.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stocktake_core::{AttributeUpdate, Extracted};
use stocktake_store::{scoped_key, Cache, RecordStore, StoreError};

use crate::aql;
use crate::bulk::collect_query;
use crate::definitions::DefinitionCache;
use crate::error::EngineError;
use crate::profile::Profile;

/// Page bound when scanning records for model candidates.
const MODEL_PAGE_SIZE: usize = 100;
/// Page size for catalogue scans.
const CATALOG_PAGE_SIZE: usize = 50;
/// How many known model names a not-found error lists.
const KNOWN_MODEL_SAMPLE: usize = 5;
/// Attribute holding a supplier record's name.
const SUPPLIER_NAME_ATTRIBUTE: &str = "Name";

/// A supplier catalogue entry: display name plus record key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierRef {
    pub name: String,
    pub key: String,
}

pub struct NameResolver<'a> {
    store: &'a dyn RecordStore,
    defs: &'a DefinitionCache<'a>,
    cache: &'a dyn Cache,
    profile: &'a Profile,
    type_ids: RefCell<HashMap<String, u64>>,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        defs: &'a DefinitionCache<'a>,
        cache: &'a dyn Cache,
        profile: &'a Profile,
    ) -> Self {
        NameResolver {
            store,
            defs,
            cache,
            profile,
            type_ids: RefCell::new(HashMap::new()),
        }
    }

    // ──────────────────────────────────────────────
    // Status
    // ──────────────────────────────────────────────

    /// Resolve a status name against the status attribute of the given
    /// object type. Non-Status attributes store display names directly,
    /// so the name passes through unchanged; Status attributes resolve
    /// to the allowed value's id, stringified.
    pub fn resolve_status(
        &self,
        object_type_id: u64,
        status_name: &str,
    ) -> Result<String, EngineError> {
        let def = self
            .defs
            .definition(object_type_id, &self.profile.status_attribute)?;
        if !def.is_status() {
            return Ok(status_name.to_string());
        }
        match def.status_values.iter().find(|sv| sv.name == status_name) {
            Some(sv) => Ok(sv.id.to_string()),
            None => Err(EngineError::StatusNotFound {
                status: status_name.to_string(),
                valid: def.status_values.iter().map(|sv| sv.name.clone()).collect(),
            }),
        }
    }

    // ──────────────────────────────────────────────
    // Model
    // ──────────────────────────────────────────────

    /// Resolve a model name to the key of the referenced model record,
    /// by scanning records of the owning type whose model attribute is
    /// set. A record key passed as the name resolves to itself. Exact
    /// display matches win; substring matches are a fallback and must
    /// land on a single distinct target to count.
    pub fn resolve_model(
        &self,
        object_type_id: u64,
        model_name: &str,
    ) -> Result<String, EngineError> {
        let model_def = self
            .defs
            .definition(object_type_id, &self.profile.model_attribute)?;
        let query = aql::all(&[
            aql::object_type(&self.profile.object_type),
            aql::attr_not_empty(&self.profile.model_attribute),
        ]);
        let page = self.store.find_by_query(&query, 0, MODEL_PAGE_SIZE)?;

        let mut fallback: Vec<(String, String)> = Vec::new();
        for record in &page.values {
            if record.key == model_name {
                return Ok(record.key.clone());
            }
            let instance = record
                .attribute_by_id(model_def.id)
                .or_else(|| record.attribute_by_name(&self.profile.model_attribute));
            let Some(instance) = instance else { continue };
            for value in &instance.values {
                let Some(target) = value.search.as_deref().or(value.referenced_key.as_deref())
                else {
                    continue;
                };
                if value.display == model_name {
                    return Ok(target.to_string());
                }
                if value.display.contains(model_name) {
                    fallback.push((target.to_string(), value.display.clone()));
                }
            }
        }

        let mut distinct: Vec<(String, String)> = Vec::new();
        for (target, display) in fallback {
            if !distinct.iter().any(|(t, _)| *t == target) {
                distinct.push((target, display));
            }
        }
        match distinct.len() {
            0 => {
                let known = self.list_models().unwrap_or_default();
                Err(EngineError::ModelNotFound {
                    model: model_name.to_string(),
                    known: known.into_iter().take(KNOWN_MODEL_SAMPLE).collect(),
                })
            }
            1 => Ok(distinct.remove(0).0),
            _ => Err(EngineError::ModelAmbiguous {
                model: model_name.to_string(),
                matches: distinct.into_iter().map(|(_, display)| display).collect(),
            }),
        }
    }

    // ──────────────────────────────────────────────
    // Supplier
    // ──────────────────────────────────────────────

    /// Look up a supplier by name without side effects.
    pub fn find_supplier(&self, name: &str) -> Result<Option<SupplierRef>, EngineError> {
        let entries = self.supplier_entries()?;
        Ok(entries
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    /// Resolve a supplier name to its record key, creating the supplier
    /// record when the catalogue has no match. The one resolver with a
    /// create-if-missing side effect; read-only callers use
    /// `find_supplier` instead.
    pub fn resolve_supplier(&self, name: &str) -> Result<String, EngineError> {
        if let Some(existing) = self.find_supplier(name)? {
            return Ok(existing.key);
        }
        info!(supplier = name, "supplier not in catalogue, creating");
        Ok(self.create_supplier(name)?.key)
    }

    /// Create a supplier record and invalidate the supplier catalogue
    /// cache entry.
    pub fn create_supplier(&self, name: &str) -> Result<SupplierRef, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(
                "supplier name is required".to_string(),
            ));
        }
        let type_id = self.supplier_type_id()?;
        let name_id = self.defs.definition_id(type_id, SUPPLIER_NAME_ATTRIBUTE)?;
        let record = self
            .store
            .create(type_id, &[AttributeUpdate::single(name_id, name)])?;
        self.cache.invalidate(Some(&self.cache_key("suppliers")));
        info!(key = %record.key, supplier = name, "created supplier record");
        Ok(SupplierRef {
            name: name.to_string(),
            key: record.key,
        })
    }

    // ──────────────────────────────────────────────
    // Catalogues
    // ──────────────────────────────────────────────

    /// Model names in use, deduplicated and sorted case-insensitively.
    pub fn list_models(&self) -> Result<Vec<String>, EngineError> {
        let key = self.cache_key("models");
        if let Some(hit) = self.cache.get(&key) {
            if let Ok(models) = serde_json::from_value::<Vec<String>>(hit) {
                debug!("model catalogue served from cache");
                return Ok(models);
            }
        }

        let type_id = self.primary_type_id()?;
        let model_def = self
            .defs
            .definition(type_id, &self.profile.model_attribute)?;
        let query = aql::all(&[
            aql::object_type(&self.profile.object_type),
            aql::attr_not_empty(&self.profile.model_attribute),
        ]);
        let records = collect_query(self.store, &query, CATALOG_PAGE_SIZE)?;

        let mut models: Vec<String> = Vec::new();
        for record in &records {
            let extracted = record
                .value_by_id(model_def.id)
                .or_else(|| record.value_by_name(&self.profile.model_attribute));
            for value in flatten(extracted) {
                if !value.is_empty() && !models.contains(&value) {
                    models.push(value);
                }
            }
        }
        models.sort_by_key(|m| m.to_lowercase());

        self.cache.put(&key, serde_json::Value::from(models.clone()));
        Ok(models)
    }

    /// Status names, from the status attribute's declared values when
    /// present, otherwise from the statuses actually in use on records.
    pub fn list_statuses(&self) -> Result<Vec<String>, EngineError> {
        let key = self.cache_key("statuses");
        if let Some(hit) = self.cache.get(&key) {
            if let Ok(statuses) = serde_json::from_value::<Vec<String>>(hit) {
                debug!("status catalogue served from cache");
                return Ok(statuses);
            }
        }

        let type_id = self.primary_type_id()?;
        let def = self
            .defs
            .definition(type_id, &self.profile.status_attribute)?;
        let mut statuses: Vec<String> = Vec::new();
        for sv in &def.status_values {
            if !statuses.contains(&sv.name) {
                statuses.push(sv.name.clone());
            }
        }

        if statuses.is_empty() {
            debug!("status attribute declares no values, scanning records");
            let query = aql::all(&[
                aql::object_type(&self.profile.object_type),
                aql::attr_not_empty(&self.profile.status_attribute),
            ]);
            let records = collect_query(self.store, &query, CATALOG_PAGE_SIZE)?;
            for record in &records {
                let extracted = record
                    .value_by_id(def.id)
                    .or_else(|| record.value_by_name(&self.profile.status_attribute));
                for value in flatten(extracted) {
                    if !value.is_empty() && !statuses.contains(&value) {
                        statuses.push(value);
                    }
                }
            }
        }
        statuses.sort();

        self.cache
            .put(&key, serde_json::Value::from(statuses.clone()));
        Ok(statuses)
    }

    /// Supplier names, deduplicated and sorted case-insensitively.
    pub fn list_suppliers(&self) -> Result<Vec<String>, EngineError> {
        Ok(self
            .supplier_entries()?
            .into_iter()
            .map(|s| s.name)
            .collect())
    }

    fn supplier_entries(&self) -> Result<Vec<SupplierRef>, EngineError> {
        let key = self.cache_key("suppliers");
        if let Some(hit) = self.cache.get(&key) {
            if let Ok(entries) = serde_json::from_value::<Vec<SupplierRef>>(hit) {
                debug!("supplier catalogue served from cache");
                return Ok(entries);
            }
        }

        let type_id = self.supplier_type_id()?;
        let query = aql::object_type(&self.profile.supplier_type);
        let records = collect_query(self.store, &query, CATALOG_PAGE_SIZE)?;

        let mut entries: Vec<SupplierRef> = Vec::new();
        for record in records {
            let name = record
                .label
                .clone()
                .or_else(|| {
                    record
                        .value_by_name(SUPPLIER_NAME_ATTRIBUTE)
                        .map(|e| e.to_display())
                })
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            if !entries.iter().any(|e| e.name.eq_ignore_ascii_case(&name)) {
                entries.push(SupplierRef {
                    name,
                    key: record.key,
                });
            }
        }
        entries.sort_by_key(|e| e.name.to_lowercase());

        if let Ok(blob) = serde_json::to_value(&entries) {
            self.cache.put(&key, blob);
        }
        Ok(entries)
    }

    /// Drop the three catalogue cache entries and the type-id cache.
    /// Returns how many cache entries were removed.
    pub fn clear_caches(&self) -> usize {
        let mut removed = 0;
        for operation in ["models", "statuses", "suppliers"] {
            removed += self.cache.invalidate(Some(&self.cache_key(operation)));
        }
        self.type_ids.borrow_mut().clear();
        removed
    }

    // ──────────────────────────────────────────────
    // Type lookup
    // ──────────────────────────────────────────────

    /// Object type id of the managed record type.
    pub fn primary_type_id(&self) -> Result<u64, EngineError> {
        self.object_type_id_by_name(&self.profile.object_type)
    }

    fn supplier_type_id(&self) -> Result<u64, EngineError> {
        self.object_type_id_by_name(&self.profile.supplier_type)
    }

    fn object_type_id_by_name(&self, type_name: &str) -> Result<u64, EngineError> {
        if let Some(id) = self.type_ids.borrow().get(type_name) {
            return Ok(*id);
        }
        let schema = self
            .store
            .get_schemas()?
            .into_iter()
            .find(|s| s.name == self.profile.schema)
            .ok_or_else(|| StoreError::SchemaNotFound {
                schema: self.profile.schema.clone(),
            })?;
        let id = self
            .store
            .get_object_types(schema.id)?
            .into_iter()
            .find(|t| t.name == type_name)
            .map(|t| t.id)
            .ok_or_else(|| StoreError::ObjectTypeNotFound {
                object_type: type_name.to_string(),
            })?;
        self.type_ids.borrow_mut().insert(type_name.to_string(), id);
        Ok(id)
    }

    fn cache_key(&self, operation: &str) -> String {
        scoped_key(operation, &self.profile.workspace)
    }
}

fn flatten(extracted: Option<Extracted>) -> Vec<String> {
    match extracted {
        None => Vec::new(),
        Some(Extracted::Single(v)) => vec![v],
        Some(Extracted::Multi(vs)) => vs,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
