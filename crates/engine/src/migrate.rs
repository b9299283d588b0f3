//! Serial-driven migration entry points.
//!
//! Operators identify records to migrate by serial number, usually via
//! a CSV export. Lookup resolves a serial to one record of the source
//! type; the batch loop gives the same error isolation as the other
//! bulk operations.

use tracing::warn;

use stocktake_core::Record;
use stocktake_store::{RecordStore, StoreError};

use crate::aql;
use crate::definitions::DefinitionCache;
use crate::error::EngineError;
use crate::mapper::{MigrationResult, SchemaMapper};
use crate::profile::Profile;

/// Upper bound on serial-equality query hits. Serials are meant to be
/// unique, so anything past the first few is noise.
const SERIAL_LOOKUP_LIMIT: usize = 10;

/// Parameters of one serial-driven migration run, shared by every
/// serial in a batch.
#[derive(Debug, Clone, Copy)]
pub struct MigrationRequest {
    pub source_type_id: u64,
    pub target_type_id: u64,
    pub delete_original: bool,
    pub dry_run: bool,
}

/// Locate the record carrying `serial` within one object type.
///
/// Several matches are tolerated with a warning, first wins. No match
/// is a not-found error; a serial the operator supplied must exist.
pub fn find_record_by_serial(
    store: &dyn RecordStore,
    profile: &Profile,
    serial: &str,
    object_type_id: u64,
) -> Result<Record, EngineError> {
    let query = aql::attr_equals(&profile.serial_attribute, serial);
    let page = store.find_by_query(&query, 0, SERIAL_LOOKUP_LIMIT)?;

    let mut hits = Vec::new();
    for hit in &page.values {
        // Search rows are attribute-sparse; work from the complete record.
        let record = store.get_by_key(&hit.key)?;
        if record.object_type_id == object_type_id {
            hits.push(record);
        }
    }

    if hits.is_empty() {
        return Err(StoreError::RecordNotFound {
            key: format!("serial {serial}"),
        }
        .into());
    }
    if hits.len() > 1 {
        warn!(
            serial,
            matches = hits.len(),
            "several records share the serial, using the first"
        );
    }
    Ok(hits.remove(0))
}

/// Migrate the record identified by `serial`. Failures become the
/// result's error payload rather than propagating.
pub fn migrate_by_serial(
    store: &dyn RecordStore,
    defs: &DefinitionCache<'_>,
    profile: &Profile,
    serial: &str,
    request: MigrationRequest,
) -> MigrationResult {
    match try_migrate(store, defs, profile, serial, request) {
        Ok(result) => result,
        Err(err) => {
            warn!(serial, error = %err, "migration failed");
            let mut result = MigrationResult::from_error(serial, request.dry_run, &err);
            result.serial = Some(serial.to_string());
            result
        }
    }
}

/// Migrate every serial in a batch, one result per serial.
pub fn migrate_batch(
    store: &dyn RecordStore,
    defs: &DefinitionCache<'_>,
    profile: &Profile,
    serials: &[String],
    request: MigrationRequest,
) -> Vec<MigrationResult> {
    serials
        .iter()
        .map(|serial| migrate_by_serial(store, defs, profile, serial, request))
        .collect()
}

fn try_migrate(
    store: &dyn RecordStore,
    defs: &DefinitionCache<'_>,
    profile: &Profile,
    serial: &str,
    request: MigrationRequest,
) -> Result<MigrationResult, EngineError> {
    let record = match find_record_by_serial(store, profile, serial, request.source_type_id) {
        Ok(record) => record,
        Err(err @ EngineError::Store(StoreError::RecordNotFound { .. })) => {
            // Re-runs hit serials that already moved. Those are benign.
            if find_record_by_serial(store, profile, serial, request.target_type_id).is_ok() {
                let mut result =
                    MigrationResult::skip(serial, request.dry_run, "already on the target type");
                result.serial = Some(serial.to_string());
                return Ok(result);
            }
            return Err(err);
        }
        Err(err) => return Err(err),
    };
    let mapper = SchemaMapper::new(store, defs);
    let mut result = mapper.migrate(
        &record,
        request.target_type_id,
        request.delete_original,
        request.dry_run,
    )?;
    result.serial = Some(serial.to_string());
    Ok(result)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stocktake_core::{AttributeDefinition, AttributeInstance, AttributeValue};
    use stocktake_store::MemoryStore;

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_schema(1, "Hardware");
        store.add_object_type(1, 10, "Laptops");
        store.add_object_type(1, 30, "Archived Laptops");
        store.set_definitions(10, vec![AttributeDefinition::new(100, "Serial Number")]);
        store.set_definitions(30, vec![AttributeDefinition::new(300, "Serial Number")]);
        store
    }

    fn seed_with_serial(store: &MemoryStore, key: &str, object_type_id: u64, serial: &str) {
        let definition_id = if object_type_id == 10 { 100 } else { 300 };
        store.seed(
            key,
            object_type_id,
            vec![AttributeInstance::new(
                definition_id,
                "Serial Number",
                vec![AttributeValue::text(serial)],
            )],
        );
    }

    #[test]
    fn serial_lookup_filters_by_object_type() {
        let store = fixture();
        seed_with_serial(&store, "HW-1", 10, "AB12");
        seed_with_serial(&store, "AR-1", 30, "AB12");

        let profile = Profile::default();
        let record = find_record_by_serial(&store, &profile, "AB12", 30).unwrap();
        assert_eq!(record.key, "AR-1");
    }

    #[test]
    fn serial_lookup_misses_loudly() {
        let store = fixture();
        let profile = Profile::default();
        let err = find_record_by_serial(&store, &profile, "NOPE", 10).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn duplicate_serials_resolve_to_first_match() {
        let store = fixture();
        seed_with_serial(&store, "HW-1", 10, "DUP1");
        seed_with_serial(&store, "HW-2", 10, "DUP1");

        let profile = Profile::default();
        let record = find_record_by_serial(&store, &profile, "DUP1", 10).unwrap();
        assert_eq!(record.key, "HW-1");
    }

    /// A serial whose record already sits on the target type skips
    /// rather than erroring, so re-running a batch is harmless.
    #[test]
    fn rerunning_a_migration_skips_moved_serials() {
        let store = fixture();
        seed_with_serial(&store, "HW-1", 10, "MOVE1");
        let defs = DefinitionCache::new(&store);
        let profile = Profile::default();
        let request = MigrationRequest {
            source_type_id: 10,
            target_type_id: 30,
            delete_original: true,
            dry_run: false,
        };

        let first = migrate_by_serial(&store, &defs, &profile, "MOVE1", request);
        assert!(first.success, "error: {:?}", first.error);

        let second = migrate_by_serial(&store, &defs, &profile, "MOVE1", request);
        assert!(second.skipped);
        assert!(second
            .skip_reason
            .as_deref()
            .unwrap_or("")
            .contains("already"));
        assert!(second.error.is_none());
    }

    #[test]
    fn batch_isolates_per_serial_failures() {
        let store = fixture();
        seed_with_serial(&store, "HW-1", 10, "GOOD1");
        seed_with_serial(&store, "HW-2", 10, "GOOD2");
        let defs = DefinitionCache::new(&store);
        let profile = Profile::default();
        let request = MigrationRequest {
            source_type_id: 10,
            target_type_id: 30,
            delete_original: false,
            dry_run: false,
        };

        let serials = vec![
            "GOOD1".to_string(),
            "GHOST".to_string(),
            "GOOD2".to_string(),
        ];
        let results = migrate_batch(&store, &defs, &profile, &serials, request);
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap_or("").contains("GHOST"));
        assert!(results[2].success);
        assert_eq!(results[2].serial.as_deref(), Some("GOOD2"));
    }
}
