//! Workflow integration tests over the in-memory backends.
//!
//! Covers the behavior operators rely on day to day:
//!
//! 1. Assignee reconciliation -- success, the skip families, dry-run
//! 2. Retirement -- success, dry-run, idempotence
//! 3. Loud failures -- missing keys and unverified updates raise
//! 4. Bulk pipeline -- error isolation, discovery to summary

use stocktake_core::{
    AttributeDefinition, AttributeInstance, AttributeValue, DefaultType, StatusValue,
};
use stocktake_engine::{
    list_records_needing_assignee, process_assignees, summarize, DefinitionCache, EngineError,
    Profile, Reconciler,
};
use stocktake_store::{MemoryIdentity, MemoryStore};

const LAPTOPS: u64 = 10;

// ──────────────────────────────────────────────
// Test fixtures
// ──────────────────────────────────────────────

/// One Hardware schema with a Laptops type carrying the attributes the
/// workflows touch.
fn store_with_schema() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_schema(1, "Hardware");
    store.add_object_type(1, LAPTOPS, "Laptops");
    store.set_definitions(
        LAPTOPS,
        vec![
            AttributeDefinition::new(100, "Serial Number"),
            AttributeDefinition::new(101, "User Email"),
            AttributeDefinition::new(102, "Assignee"),
            AttributeDefinition::new(103, "Retirement Date"),
            AttributeDefinition {
                id: 104,
                name: "Asset Status".to_string(),
                kind: Some(7),
                default_type: Some(DefaultType {
                    id: 7,
                    name: "Status".to_string(),
                }),
                status_values: vec![
                    StatusValue {
                        id: 1,
                        name: "In Use".to_string(),
                    },
                    StatusValue {
                        id: 2,
                        name: "Retired".to_string(),
                    },
                ],
            },
        ],
    );
    store
}

fn text(id: u64, name: &str, value: &str) -> AttributeInstance {
    AttributeInstance::new(id, name, vec![AttributeValue::text(value)])
}

fn directory() -> MemoryIdentity {
    let identity = MemoryIdentity::new();
    identity.add_user("alice@example.com", "acc-alice", true);
    identity.add_user("bob@example.com", "acc-bob", true);
    identity.add_user("carol@example.com", "acc-carol", false);
    identity
}

// ──────────────────────────────────────────────
// Assignee workflow
// ──────────────────────────────────────────────

/// A record with an email and no assignee resolves and reports the new
/// assignee; dry-run leaves the store untouched.
#[test]
fn assignee_dry_run_resolves_without_writing() {
    let store = store_with_schema();
    store.seed(
        "HW-100",
        LAPTOPS,
        vec![text(101, "User Email", "alice@example.com")],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_assignee("HW-100", true).unwrap();
    assert!(result.success);
    assert!(!result.skipped);
    assert!(!result.updated);
    assert_eq!(result.new_assignee.as_deref(), Some("acc-alice"));

    let record = store.record("HW-100").unwrap();
    assert!(record.value_by_name("Assignee").is_none());
}

/// No user-email attribute is the benign skip, not an error.
#[test]
fn assignee_skips_records_without_email() {
    let store = store_with_schema();
    store.seed("HW-101", LAPTOPS, vec![]);
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_assignee("HW-101", true).unwrap();
    assert!(!result.success);
    assert!(result.skipped);
    assert!(result.skip_reason.as_deref().unwrap_or("").contains("no"));
}

/// An assignee matching the resolved account skips with a message
/// naming the account.
#[test]
fn assignee_skips_when_already_set() {
    let store = store_with_schema();
    store.seed(
        "HW-102",
        LAPTOPS,
        vec![
            text(101, "User Email", "bob@example.com"),
            text(102, "Assignee", "acc-bob"),
        ],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_assignee("HW-102", false).unwrap();
    assert!(result.skipped);
    assert!(result
        .skip_reason
        .as_deref()
        .unwrap_or("")
        .starts_with("Assignee already set to"));
}

/// An inactive directory account skips rather than assigning a dead id.
#[test]
fn assignee_skips_inactive_accounts() {
    let store = store_with_schema();
    store.seed(
        "HW-103",
        LAPTOPS,
        vec![text(101, "User Email", "carol@example.com")],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_assignee("HW-103", false).unwrap();
    assert!(result.skipped);
    assert!(result
        .skip_reason
        .as_deref()
        .unwrap_or("")
        .contains("invalid or inactive"));
}

/// Unknown emails skip; the directory lookup failure is expected noise.
#[test]
fn assignee_skips_unknown_emails() {
    let store = store_with_schema();
    store.seed(
        "HW-104",
        LAPTOPS,
        vec![text(101, "User Email", "ghost@example.com")],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_assignee("HW-104", false).unwrap();
    assert!(result.skipped);
    assert!(result
        .skip_reason
        .as_deref()
        .unwrap_or("")
        .contains("user lookup failed"));
}

/// Running the workflow twice with no state change in between updates
/// once, then skips.
#[test]
fn assignee_workflow_is_idempotent() {
    let store = store_with_schema();
    store.seed(
        "HW-105",
        LAPTOPS,
        vec![text(101, "User Email", "alice@example.com")],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let first = reconciler.process_assignee("HW-105", false).unwrap();
    assert!(first.success);
    assert!(first.updated);

    let second = reconciler.process_assignee("HW-105", false).unwrap();
    assert!(second.skipped);
    assert!(!second.updated);
    assert!(second
        .skip_reason
        .as_deref()
        .unwrap_or("")
        .starts_with("Assignee already set to"));
}

// ──────────────────────────────────────────────
// Retirement workflow
// ──────────────────────────────────────────────

/// Dry-run reports the planned transition with the extracted fields.
#[test]
fn retirement_dry_run_reports_planned_transition() {
    let store = store_with_schema();
    store.seed(
        "HW-493",
        LAPTOPS,
        vec![
            text(103, "Retirement Date", "2024-01-01"),
            text(104, "Asset Status", "In Use"),
        ],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_retirement("HW-493", true).unwrap();
    assert!(result.success);
    assert!(!result.updated);
    assert_eq!(result.retirement_date.as_deref(), Some("2024-01-01"));
    assert_eq!(result.current_status.as_deref(), Some("In Use"));
    assert_eq!(result.new_status.as_deref(), Some("Retired"));
}

/// Retiring twice never errors: first run writes, second run skips.
#[test]
fn retirement_workflow_is_idempotent() {
    let store = store_with_schema();
    store.seed(
        "HW-494",
        LAPTOPS,
        vec![
            text(103, "Retirement Date", "2024-02-02"),
            text(104, "Asset Status", "In Use"),
        ],
    );
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let first = reconciler.process_retirement("HW-494", false).unwrap();
    assert!(first.success);
    assert!(first.updated);

    let record = store.record("HW-494").unwrap();
    assert_eq!(
        record
            .value_by_name("Asset Status")
            .and_then(|e| e.scalar().map(String::from)),
        Some("Retired".to_string())
    );

    let second = reconciler.process_retirement("HW-494", false).unwrap();
    assert!(second.skipped);
    assert_eq!(
        second.skip_reason.as_deref(),
        Some("status already Retired")
    );
}

/// Without a retirement date there is nothing to do.
#[test]
fn retirement_skips_records_without_a_date() {
    let store = store_with_schema();
    store.seed("HW-495", LAPTOPS, vec![text(104, "Asset Status", "In Use")]);
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let result = reconciler.process_retirement("HW-495", false).unwrap();
    assert!(result.skipped);
}

// ──────────────────────────────────────────────
// Failure surfacing
// ──────────────────────────────────────────────

/// A missing record key raises; it is operator error, never a skip.
#[test]
fn missing_records_raise_not_found() {
    let store = store_with_schema();
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let err = reconciler.process_assignee("HW-404", false).unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(err.to_string().contains("HW-404"));

    let err = reconciler.process_retirement("HW-404", false).unwrap_err();
    assert!(err.to_string().contains("HW-404"));
}

/// A write the backend acknowledges but the re-read does not reflect
/// is an update-verification error.
#[test]
fn unverified_updates_raise() {
    let store = store_with_schema();
    store.seed(
        "HW-200",
        LAPTOPS,
        vec![text(101, "User Email", "alice@example.com")],
    );
    store.ignore_updates();
    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let err = reconciler.process_assignee("HW-200", false).unwrap_err();
    assert!(matches!(err, EngineError::UpdateVerification { .. }));

    store.seed(
        "HW-201",
        LAPTOPS,
        vec![
            text(103, "Retirement Date", "2024-03-03"),
            text(104, "Asset Status", "In Use"),
        ],
    );
    let err = reconciler.process_retirement("HW-201", false).unwrap_err();
    assert!(matches!(err, EngineError::UpdateVerification { .. }));
}

// ──────────────────────────────────────────────
// Bulk pipeline
// ──────────────────────────────────────────────

/// One record failing to fetch becomes one error result; the other
/// records keep their own outcomes.
#[test]
fn bulk_processing_isolates_failures() {
    let store = store_with_schema();
    store.seed(
        "HW-1",
        LAPTOPS,
        vec![text(101, "User Email", "alice@example.com")],
    );
    store.seed(
        "HW-2",
        LAPTOPS,
        vec![text(101, "User Email", "bob@example.com")],
    );
    store.seed("HW-3", LAPTOPS, vec![]);
    store.fail_get("HW-2");

    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let keys = vec!["HW-1".to_string(), "HW-2".to_string(), "HW-3".to_string()];
    let results = process_assignees(&reconciler, &keys, false);

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(results[1].error.is_some());
    assert!(results[1].error_category.is_some());
    assert!(results[2].skipped);
}

/// Discovery feeds processing feeds the summary; the numbers line up.
#[test]
fn discovery_to_summary_pipeline() {
    let store = store_with_schema();
    store.seed(
        "HW-1",
        LAPTOPS,
        vec![text(101, "User Email", "alice@example.com")],
    );
    store.seed(
        "HW-2",
        LAPTOPS,
        vec![text(101, "User Email", "bob@example.com")],
    );
    // Already assigned, so discovery must not return it.
    store.seed(
        "HW-3",
        LAPTOPS,
        vec![
            text(101, "User Email", "alice@example.com"),
            text(102, "Assignee", "acc-alice"),
        ],
    );

    let identity = directory();
    let defs = DefinitionCache::new(&store);
    let profile = Profile::default();
    let reconciler = Reconciler::new(&store, &identity, &defs, &profile);

    let needing = list_records_needing_assignee(&store, &profile).unwrap();
    let keys: Vec<String> = needing.iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, vec!["HW-1".to_string(), "HW-2".to_string()]);

    let results = process_assignees(&reconciler, &keys, false);
    let summary = summarize(&results);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.errors, 0);
}
