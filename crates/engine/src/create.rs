//! Asset creation from operator input.
//!
//! This is the one workflow fed raw human input, so every field is
//! validated at the boundary and failures become result payloads
//! instead of aborting a batch. Model and status names resolve through
//! the resolver; suppliers are created on demand except under dry-run,
//! which must leave the backend untouched.

use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Month};
use tracing::{info, warn};

use stocktake_core::AttributeUpdate;
use stocktake_store::RecordStore;

use crate::aql;
use crate::definitions::DefinitionCache;
use crate::error::{EngineError, ErrorCategory};
use crate::profile::Profile;
use crate::resolve::NameResolver;

const SERIAL_MIN_CHARS: usize = 2;
const SERIAL_MAX_CHARS: usize = 128;

/// Operator-supplied fields for a new asset. `serial`, `model` and
/// `status` are required, the rest optional.
#[derive(Debug, Clone, Default)]
pub struct NewAssetInput {
    pub serial: String,
    pub model: String,
    pub status: String,
    pub invoice: Option<String>,
    pub purchase_date: Option<String>,
    pub cost: Option<String>,
    pub colour: Option<String>,
    pub supplier: Option<String>,
}

/// Outcome of one creation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CreationResult {
    pub serial: String,
    /// Key of the created record; absent on dry-run and on failure.
    pub key: Option<String>,
    pub success: bool,
    pub dry_run: bool,
    pub error: Option<String>,
    pub error_category: Option<ErrorCategory>,
    /// Human notes, e.g. what a dry-run would have done.
    pub notes: Vec<String>,
}

impl CreationResult {
    fn new(serial: &str, dry_run: bool) -> Self {
        CreationResult {
            serial: serial.to_string(),
            key: None,
            success: false,
            dry_run,
            error: None,
            error_category: None,
            notes: Vec::new(),
        }
    }

    fn from_error(serial: &str, dry_run: bool, error: &EngineError) -> Self {
        let mut result = CreationResult::new(serial, dry_run);
        result.error = Some(error.to_string());
        result.error_category = Some(error.category());
        result
    }
}

/// Creates inventory records from validated operator input.
pub struct AssetCreator<'a> {
    store: &'a dyn RecordStore,
    defs: &'a DefinitionCache<'a>,
    resolver: &'a NameResolver<'a>,
    profile: &'a Profile,
}

impl<'a> AssetCreator<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        defs: &'a DefinitionCache<'a>,
        resolver: &'a NameResolver<'a>,
        profile: &'a Profile,
    ) -> Self {
        AssetCreator {
            store,
            defs,
            resolver,
            profile,
        }
    }

    /// Validate, resolve and create one asset. Failures of any kind
    /// land in the result payload.
    pub fn create_asset(&self, input: &NewAssetInput, dry_run: bool) -> CreationResult {
        match self.try_create(input, dry_run) {
            Ok(result) => result,
            Err(err) => {
                warn!(serial = %input.serial.trim(), error = %err, "asset creation failed");
                CreationResult::from_error(input.serial.trim(), dry_run, &err)
            }
        }
    }

    fn try_create(
        &self,
        input: &NewAssetInput,
        dry_run: bool,
    ) -> Result<CreationResult, EngineError> {
        let serial = input.serial.trim();
        let length = serial.chars().count();
        if !(SERIAL_MIN_CHARS..=SERIAL_MAX_CHARS).contains(&length) {
            return Err(EngineError::Validation(format!(
                "serial must be {SERIAL_MIN_CHARS} to {SERIAL_MAX_CHARS} characters, got {length}"
            )));
        }
        let model = input.model.trim();
        if model.is_empty() {
            return Err(EngineError::Validation("model is required".to_string()));
        }
        let status = input.status.trim();
        if status.is_empty() {
            return Err(EngineError::Validation("status is required".to_string()));
        }

        let duplicates = self.store.find_by_query(
            &aql::attr_equals(&self.profile.serial_attribute, serial),
            0,
            1,
        )?;
        if let Some(existing) = duplicates.values.first() {
            return Err(EngineError::Validation(format!(
                "a record with serial {serial} already exists: {}",
                existing.key
            )));
        }

        let type_id = self.resolver.primary_type_id()?;
        let model_key = self.resolver.resolve_model(type_id, model)?;
        let status_value = self.resolver.resolve_status(type_id, status)?;

        let mut result = CreationResult::new(serial, dry_run);
        let mut updates = vec![
            self.defs
                .build_update(type_id, &self.profile.serial_attribute, serial)?,
            self.defs
                .build_update(type_id, &self.profile.model_attribute, &model_key)?,
            self.defs
                .build_update(type_id, &self.profile.status_attribute, &status_value)?,
        ];

        if let Some(invoice) = nonblank(&input.invoice) {
            updates.push(self.defs.build_update(
                type_id,
                &self.profile.invoice_attribute,
                invoice,
            )?);
        }
        if let Some(date) = nonblank(&input.purchase_date) {
            let normalized = normalize_date(date)?;
            updates.push(self.defs.build_update(
                type_id,
                &self.profile.purchase_date_attribute,
                normalized,
            )?);
        }
        if let Some(cost) = nonblank(&input.cost) {
            let amount: Decimal = cost.parse().map_err(|_| {
                EngineError::Validation(format!("cost '{cost}' is not a number"))
            })?;
            if amount < Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "cost cannot be negative, got {amount}"
                )));
            }
            updates.push(self.defs.build_update(
                type_id,
                &self.profile.cost_attribute,
                amount,
            )?);
        }
        if let Some(colour) = nonblank(&input.colour) {
            updates.push(self.defs.build_update(
                type_id,
                &self.profile.colour_attribute,
                colour,
            )?);
        }
        if let Some(supplier) = nonblank(&input.supplier) {
            if dry_run {
                // Never create a supplier during dry-run.
                match self.resolver.find_supplier(supplier)? {
                    Some(existing) => updates.push(self.defs.build_update(
                        type_id,
                        &self.profile.supplier_attribute,
                        existing.key,
                    )?),
                    None => result
                        .notes
                        .push(format!("supplier '{supplier}' would be created")),
                }
            } else {
                let key = self.resolver.resolve_supplier(supplier)?;
                updates.push(self.defs.build_update(
                    type_id,
                    &self.profile.supplier_attribute,
                    key,
                )?);
            }
        }

        if dry_run {
            result
                .notes
                .push(format!("would create a record with {} attributes", updates.len()));
            result.success = true;
            return Ok(result);
        }

        let created = self.store.create(type_id, &updates)?;
        info!(serial, key = %created.key, "asset created");
        result.key = Some(created.key);
        result.success = true;
        Ok(result)
    }
}

/// Normalize an operator date to `YYYY-MM-DD`.
///
/// Accepts year-first and day-first forms with `-` or `/` separators
/// and one- or two-digit day and month. A four-digit first token
/// selects year-first. The result is checked as a real calendar date.
pub fn normalize_date(input: &str) -> Result<String, EngineError> {
    let parts: Vec<&str> = input.trim().split(['-', '/']).collect();
    let invalid = || {
        EngineError::Validation(format!(
            "invalid date '{}', accepted forms: YYYY-MM-DD, YYYY/MM/DD, DD-MM-YYYY, DD/MM/YYYY",
            input.trim()
        ))
    };
    if parts.len() != 3 {
        return Err(invalid());
    }
    let numbers: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    let (year, month, day) = if parts[0].len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        (numbers[2], numbers[1], numbers[0])
    };

    let month_number = u8::try_from(month).map_err(|_| invalid())?;
    let month_name = Month::try_from(month_number).map_err(|_| invalid())?;
    let day_number = u8::try_from(day).map_err(|_| invalid())?;
    let year_number = i32::try_from(year).map_err(|_| invalid())?;
    Date::from_calendar_date(year_number, month_name, day_number).map_err(|_| invalid())?;

    Ok(format!("{year:04}-{month:02}-{day:02}"))
}

fn nonblank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stocktake_core::{
        AttributeDefinition, AttributeInstance, AttributeValue, DefaultType, StatusValue,
    };
    use stocktake_store::{MemoryCache, MemoryStore};

    const LAPTOPS: u64 = 10;
    const SUPPLIERS: u64 = 20;

    fn fixture() -> (MemoryStore, Profile) {
        let store = MemoryStore::new();
        store.add_schema(1, "Hardware");
        store.add_object_type(1, LAPTOPS, "Laptops");
        store.add_object_type(1, SUPPLIERS, "Suppliers");
        store.set_definitions(
            LAPTOPS,
            vec![
                AttributeDefinition::new(100, "Serial Number"),
                AttributeDefinition {
                    id: 101,
                    name: "Asset Status".to_string(),
                    kind: Some(7),
                    default_type: Some(DefaultType {
                        id: 7,
                        name: "Status".to_string(),
                    }),
                    status_values: vec![
                        StatusValue { id: 1, name: "In Use".to_string() },
                        StatusValue { id: 2, name: "Retired".to_string() },
                    ],
                },
                AttributeDefinition::new(102, "Model"),
                AttributeDefinition::new(103, "Invoice Number"),
                AttributeDefinition::new(104, "Purchase Date"),
                AttributeDefinition::new(105, "Cost"),
                AttributeDefinition::new(106, "Colour"),
                AttributeDefinition::new(107, "Supplier"),
            ],
        );
        store.set_definitions(SUPPLIERS, vec![AttributeDefinition::new(200, "Name")]);

        // One existing laptop gives the model catalogue an entry.
        store.seed(
            "HW-1",
            LAPTOPS,
            vec![
                AttributeInstance::new(100, "Serial Number", vec![AttributeValue::text("SEED01")]),
                AttributeInstance {
                    definition_id: 102,
                    name: Some("Model".to_string()),
                    values: vec![AttributeValue {
                        raw: "MOD-1".to_string(),
                        display: "MacBook Pro 14".to_string(),
                        search: None,
                        referenced_key: Some("MOD-1".to_string()),
                    }],
                },
            ],
        );

        let mut profile = Profile::default();
        profile.workspace = "ws-test-1".to_string();
        (store, profile)
    }

    fn input(serial: &str) -> NewAssetInput {
        NewAssetInput {
            serial: serial.to_string(),
            model: "MacBook Pro 14".to_string(),
            status: "In Use".to_string(),
            ..NewAssetInput::default()
        }
    }

    #[test]
    fn validation_rejects_out_of_range_serials_and_empty_fields() {
        let (store, profile) = fixture();
        let defs = DefinitionCache::new(&store);
        let cache = MemoryCache::new();
        let resolver = NameResolver::new(&store, &defs, &cache, &profile);
        let creator = AssetCreator::new(&store, &defs, &resolver, &profile);

        let short = creator.create_asset(&input("X"), false);
        assert!(!short.success);
        assert!(short.error.as_deref().unwrap_or("").contains("serial"));

        let long = creator.create_asset(&input(&"X".repeat(129)), false);
        assert!(!long.success);

        let mut no_model = input("AB1234");
        no_model.model = "  ".to_string();
        let result = creator.create_asset(&no_model, false);
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("model"));
    }

    #[test]
    fn duplicate_serial_is_a_validation_failure() {
        let (store, profile) = fixture();
        let defs = DefinitionCache::new(&store);
        let cache = MemoryCache::new();
        let resolver = NameResolver::new(&store, &defs, &cache, &profile);
        let creator = AssetCreator::new(&store, &defs, &resolver, &profile);

        let result = creator.create_asset(&input(" SEED01 "), false);
        assert!(!result.success);
        let message = result.error.unwrap();
        assert!(message.contains("already exists"));
        assert!(message.contains("HW-1"));
    }

    #[test]
    fn dry_run_resolves_but_writes_nothing() {
        let (store, profile) = fixture();
        let defs = DefinitionCache::new(&store);
        let cache = MemoryCache::new();
        let resolver = NameResolver::new(&store, &defs, &cache, &profile);
        let creator = AssetCreator::new(&store, &defs, &resolver, &profile);

        let mut fields = input("NEW001");
        fields.supplier = Some("Fresh Supplies Ltd".to_string());
        let result = creator.create_asset(&fields, true);

        assert!(result.success);
        assert!(result.dry_run);
        assert_eq!(result.key, None);
        assert!(result
            .notes
            .iter()
            .any(|n| n.contains("Fresh Supplies Ltd") && n.contains("would be created")));

        // Neither the asset nor the supplier exists afterwards.
        let assets = store
            .find_by_query("\"Serial Number\" = \"NEW001\"", 0, 10)
            .unwrap();
        assert_eq!(assets.total, 0);
        let suppliers = store
            .find_by_query("objectType = \"Suppliers\"", 0, 10)
            .unwrap();
        assert_eq!(suppliers.total, 0);
    }

    #[test]
    fn creation_persists_resolved_values() {
        let (store, profile) = fixture();
        let defs = DefinitionCache::new(&store);
        let cache = MemoryCache::new();
        let resolver = NameResolver::new(&store, &defs, &cache, &profile);
        let creator = AssetCreator::new(&store, &defs, &resolver, &profile);

        let fields = NewAssetInput {
            serial: "NEW002".to_string(),
            model: "MacBook Pro 14".to_string(),
            status: "In Use".to_string(),
            invoice: Some("INV-77".to_string()),
            purchase_date: Some("5/3/2024".to_string()),
            cost: Some("1999.99".to_string()),
            colour: Some("Silver".to_string()),
            supplier: Some("Acme Ltd".to_string()),
        };
        let result = creator.create_asset(&fields, false);
        assert!(result.success, "error: {:?}", result.error);

        let key = result.key.unwrap();
        let record = store.record(&key).unwrap();
        let scalar = |name: &str| {
            record
                .value_by_name(name)
                .and_then(|e| e.scalar().map(String::from))
                .unwrap()
        };
        assert_eq!(scalar("Serial Number"), "NEW002");
        assert_eq!(scalar("Model"), "MOD-1");
        // Status-typed attribute stores the stringified status id.
        assert_eq!(scalar("Asset Status"), "1");
        assert_eq!(scalar("Purchase Date"), "2024-03-05");
        assert_eq!(scalar("Cost"), "1999.99");

        // The missing supplier was created and referenced by key.
        let suppliers = store
            .find_by_query("objectType = \"Suppliers\"", 0, 10)
            .unwrap();
        assert_eq!(suppliers.total, 1);
        assert_eq!(scalar("Supplier"), suppliers.values[0].key);
    }

    #[test]
    fn negative_and_malformed_costs_are_rejected() {
        let (store, profile) = fixture();
        let defs = DefinitionCache::new(&store);
        let cache = MemoryCache::new();
        let resolver = NameResolver::new(&store, &defs, &cache, &profile);
        let creator = AssetCreator::new(&store, &defs, &resolver, &profile);

        let mut fields = input("NEW003");
        fields.cost = Some("-5".to_string());
        let negative = creator.create_asset(&fields, true);
        assert!(!negative.success);
        assert!(negative.error.as_deref().unwrap_or("").contains("negative"));

        fields.cost = Some("a lot".to_string());
        let malformed = creator.create_asset(&fields, true);
        assert!(!malformed.success);
    }

    #[test]
    fn date_normalization_accepts_both_orders() {
        assert_eq!(normalize_date("2024-03-05").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("2024/3/5").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("5-3-2024").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("05/03/2024").unwrap(), "2024-03-05");
        assert_eq!(normalize_date(" 31/12/2023 ").unwrap(), "2023-12-31");
    }

    #[test]
    fn impossible_dates_are_rejected_with_the_accepted_forms() {
        for bad in ["31-02-2024", "2024-13-01", "not-a-date", "2024-01", ""] {
            let err = normalize_date(bad).unwrap_err();
            assert!(err.to_string().contains("YYYY-MM-DD"), "input: {bad}");
        }
    }
}
