//! Name-keyed attribute mapping between object types, and the migrate
//! sequence built on it.
//!
//! Mapping matches attributes by definition name, not id; ids are
//! type-local and never line up across object types. Declared-type
//! differences produce warnings rather than errors because the backend
//! is the authority on what coerces.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use stocktake_core::{AttributeDefinition, AttributeUpdate, Record};
use stocktake_store::{RecordStore, StoreError};

use crate::definitions::DefinitionCache;
use crate::error::{EngineError, ErrorCategory};

/// One source attribute carried over to the target type.
#[derive(Debug, Clone, Serialize)]
pub struct MappedAttribute {
    /// Definition id on the target object type.
    pub target_definition_id: u64,
    pub name: String,
    /// Source values, copied as raw strings.
    pub values: Vec<String>,
}

/// Outcome of projecting one record's attributes onto a target type.
/// Every named source attribute with at least one value lands in
/// exactly one of `mapped` or `unmapped`.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeMapping {
    pub mapped: Vec<MappedAttribute>,
    pub warnings: Vec<String>,
    pub unmapped: Vec<String>,
}

/// Per-record outcome of a migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Serial the record was located by, when migration ran off a
    /// serial batch.
    pub serial: Option<String>,
    pub source_key: String,
    pub new_key: Option<String>,
    pub new_id: Option<String>,
    pub mapped_attribute_count: usize,
    pub warnings: Vec<String>,
    pub unmapped_attributes: Vec<String>,
    pub original_deleted: bool,
    pub success: bool,
    pub dry_run: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub error_category: Option<ErrorCategory>,
}

impl MigrationResult {
    pub fn new(source_key: &str, dry_run: bool) -> Self {
        MigrationResult {
            serial: None,
            source_key: source_key.to_string(),
            new_key: None,
            new_id: None,
            mapped_attribute_count: 0,
            warnings: Vec::new(),
            unmapped_attributes: Vec::new(),
            original_deleted: false,
            success: false,
            dry_run,
            skipped: false,
            skip_reason: None,
            error: None,
            error_category: None,
        }
    }

    pub fn skip(source_key: &str, dry_run: bool, reason: impl Into<String>) -> Self {
        let mut result = MigrationResult::new(source_key, dry_run);
        result.skipped = true;
        result.skip_reason = Some(reason.into());
        result
    }

    pub fn from_error(source_key: &str, dry_run: bool, error: &EngineError) -> Self {
        let mut result = MigrationResult::new(source_key, dry_run);
        result.error = Some(error.to_string());
        result.error_category = Some(error.category());
        result
    }
}

/// Maps records across object types and runs migrations.
pub struct SchemaMapper<'a> {
    store: &'a dyn RecordStore,
    defs: &'a DefinitionCache<'a>,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(store: &'a dyn RecordStore, defs: &'a DefinitionCache<'a>) -> Self {
        SchemaMapper { store, defs }
    }

    /// Project `source`'s attributes onto the target type by name.
    ///
    /// Instances with zero values are skipped outright: absence of
    /// data, not absence of a slot. Instances whose name cannot be
    /// recovered from either the instance or the source definitions
    /// are reported as a warning.
    ///
    /// # Arguments
    ///
    /// * `source_defs` - attribute definitions of the source type
    /// * `source` - the record being projected
    /// * `target_type_id` - object type receiving the record
    pub fn map_attributes(
        &self,
        source_defs: &[AttributeDefinition],
        source: &Record,
        target_type_id: u64,
    ) -> Result<AttributeMapping, EngineError> {
        let target_defs = self.defs.definitions(target_type_id)?;
        let targets_by_name: HashMap<&str, &AttributeDefinition> = target_defs
            .iter()
            .map(|d| (d.name.as_str(), d))
            .collect();
        let sources_by_id: HashMap<u64, &AttributeDefinition> =
            source_defs.iter().map(|d| (d.id, d)).collect();

        let mut mapping = AttributeMapping {
            mapped: Vec::new(),
            warnings: Vec::new(),
            unmapped: Vec::new(),
        };

        for instance in &source.attributes {
            if instance.values.is_empty() {
                continue;
            }
            let source_def = sources_by_id.get(&instance.definition_id).copied();
            let name = instance
                .name
                .clone()
                .or_else(|| source_def.map(|d| d.name.clone()));
            let Some(name) = name else {
                mapping.warnings.push(format!(
                    "attribute {} carries values but no resolvable name, not migrated",
                    instance.definition_id
                ));
                continue;
            };

            match targets_by_name.get(name.as_str()) {
                Some(target) => {
                    if let Some(source_def) = source_def {
                        if types_differ(source_def, target) {
                            mapping.warnings.push(format!(
                                "type mismatch on \"{name}\": source is {}, target is {}",
                                source_def.type_label(),
                                target.type_label()
                            ));
                        }
                    }
                    mapping.mapped.push(MappedAttribute {
                        target_definition_id: target.id,
                        name,
                        values: instance.values.iter().map(|v| v.raw.clone()).collect(),
                    });
                }
                None => mapping.unmapped.push(name),
            }
        }

        debug!(
            source = %source.key,
            target_type_id,
            mapped = mapping.mapped.len(),
            unmapped = mapping.unmapped.len(),
            "attributes mapped"
        );
        Ok(mapping)
    }

    /// Move one record to another object type.
    ///
    /// When `delete_original` is set the source record is deleted
    /// before the replacement is created, so types sharing a
    /// uniqueness scope cannot reject the new record as a duplicate.
    /// A failed delete aborts the migration; nothing is created.
    /// Dry-run performs the mapping only and reports projected counts.
    pub fn migrate(
        &self,
        source: &Record,
        target_type_id: u64,
        delete_original: bool,
        dry_run: bool,
    ) -> Result<MigrationResult, EngineError> {
        let source_defs = self.defs.definitions(source.object_type_id)?;
        let mapping = self.map_attributes(&source_defs, source, target_type_id)?;

        let mut result = MigrationResult::new(&source.key, dry_run);
        result.mapped_attribute_count = mapping.mapped.len();
        result.warnings = mapping.warnings.clone();
        result.unmapped_attributes = mapping.unmapped.clone();

        if dry_run {
            result.success = true;
            return Ok(result);
        }

        if delete_original {
            let deleted = self.store.delete(&source.id)?;
            if !deleted {
                return Err(StoreError::Backend {
                    context: format!("delete of {}", source.key),
                    message: "backend reported nothing deleted, migration aborted".to_string(),
                }
                .into());
            }
            result.original_deleted = true;
        }

        let updates: Vec<AttributeUpdate> = mapping
            .mapped
            .iter()
            .map(|m| AttributeUpdate::with_values(m.target_definition_id, m.values.clone()))
            .collect();
        let created = self.store.create(target_type_id, &updates)?;
        info!(source = %source.key, new = %created.key, target_type_id, "record migrated");

        result.new_key = Some(created.key);
        result.new_id = Some(created.id);
        result.success = true;
        Ok(result)
    }
}

fn types_differ(source: &AttributeDefinition, target: &AttributeDefinition) -> bool {
    match (source.kind, target.kind) {
        (Some(s), Some(t)) => s != t,
        _ => source.type_label() != target.type_label(),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stocktake_core::{AttributeInstance, AttributeValue, DefaultType};
    use stocktake_store::MemoryStore;

    fn typed(id: u64, name: &str, kind: i64, type_name: &str) -> AttributeDefinition {
        let mut def = AttributeDefinition::new(id, name);
        def.kind = Some(kind);
        def.default_type = Some(DefaultType {
            id: kind,
            name: type_name.to_string(),
        });
        def
    }

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_schema(1, "Hardware");
        store.add_object_type(1, 10, "Laptops");
        store.add_object_type(1, 30, "Archived Laptops");
        store.set_definitions(
            10,
            vec![
                typed(100, "Serial Number", 0, "Text"),
                typed(101, "Cost", 0, "Text"),
                typed(102, "Colour", 0, "Text"),
                typed(103, "Notes", 0, "Text"),
            ],
        );
        store.set_definitions(
            30,
            vec![
                typed(300, "Serial Number", 0, "Text"),
                typed(301, "Cost", 1, "Integer"),
            ],
        );
        store
    }

    fn source_record(store: &MemoryStore) -> Record {
        store.seed(
            "HW-7",
            10,
            vec![
                AttributeInstance::new(100, "Serial Number", vec![AttributeValue::text("AB12")]),
                AttributeInstance::new(101, "Cost", vec![AttributeValue::text("1200")]),
                AttributeInstance::new(102, "Colour", vec![AttributeValue::text("Silver")]),
                AttributeInstance::new(103, "Notes", vec![]),
            ],
        )
    }

    /// Every named non-empty source attribute lands in exactly one of
    /// mapped or unmapped; empty ones land in neither.
    #[test]
    fn mapping_buckets_each_attribute_once() {
        let store = fixture();
        let source = source_record(&store);
        let defs = DefinitionCache::new(&store);
        let mapper = SchemaMapper::new(&store, &defs);

        let source_defs = defs.definitions(10).unwrap();
        let mapping = mapper.map_attributes(&source_defs, &source, 30).unwrap();

        let mapped_names: Vec<&str> = mapping.mapped.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(mapped_names, vec!["Serial Number", "Cost"]);
        assert_eq!(mapping.unmapped, vec!["Colour".to_string()]);
        assert_eq!(mapping.mapped[0].target_definition_id, 300);

        // Cost moves Text -> Integer, so a single mismatch warning.
        assert_eq!(mapping.warnings.len(), 1);
        assert!(mapping.warnings[0].contains("Cost"));
    }

    #[test]
    fn mapping_recovers_names_from_source_definitions() {
        let store = fixture();
        let source = store.seed(
            "HW-8",
            10,
            vec![AttributeInstance {
                definition_id: 100,
                name: None,
                values: vec![AttributeValue::text("ZZ99")],
            }],
        );
        let defs = DefinitionCache::new(&store);
        let mapper = SchemaMapper::new(&store, &defs);

        let source_defs = defs.definitions(10).unwrap();
        let mapping = mapper.map_attributes(&source_defs, &source, 30).unwrap();
        assert_eq!(mapping.mapped.len(), 1);
        assert_eq!(mapping.mapped[0].name, "Serial Number");
        assert!(mapping.warnings.is_empty());
    }

    #[test]
    fn migrate_dry_run_reports_counts_without_writing() {
        let store = fixture();
        let source = source_record(&store);
        let defs = DefinitionCache::new(&store);
        let mapper = SchemaMapper::new(&store, &defs);

        let result = mapper.migrate(&source, 30, true, true).unwrap();
        assert!(result.success);
        assert!(result.dry_run);
        assert_eq!(result.mapped_attribute_count, 2);
        assert_eq!(result.new_key, None);
        assert!(!result.original_deleted);
        // Source untouched, no replacement created.
        assert!(store.record("HW-7").is_some());
        let page = store
            .find_by_query("objectType = \"Archived Laptops\"", 0, 10)
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn migrate_deletes_source_then_creates_replacement() {
        let store = fixture();
        let source = source_record(&store);
        let defs = DefinitionCache::new(&store);
        let mapper = SchemaMapper::new(&store, &defs);

        let result = mapper.migrate(&source, 30, true, false).unwrap();
        assert!(result.success);
        assert!(result.original_deleted);
        let new_key = result.new_key.unwrap();
        assert!(store.record("HW-7").is_none());

        let migrated = store.record(&new_key).unwrap();
        assert_eq!(migrated.object_type_id, 30);
        assert_eq!(
            migrated.value_by_name("Serial Number"),
            Some(stocktake_core::Extracted::Single("AB12".to_string()))
        );
    }

    #[test]
    fn migrate_aborts_when_delete_fails() {
        let store = fixture();
        let source = source_record(&store);
        store.fail_delete(&source.id);
        let defs = DefinitionCache::new(&store);
        let mapper = SchemaMapper::new(&store, &defs);

        let before = store.record("HW-7").is_some();
        let outcome = mapper.migrate(&source, 30, true, false);
        assert!(before);
        assert!(outcome.is_err());
        // Source survives and nothing was created on the target type.
        assert!(store.record("HW-7").is_some());
        let page = store
            .find_by_query("objectType = \"Archived Laptops\"", 0, 10)
            .unwrap();
        assert_eq!(page.total, 0);
    }
}
