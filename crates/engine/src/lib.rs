//! Reconciliation engine for the asset inventory.
//!
//! Everything here runs against the collaborator traits from
//! `stocktake-store`, so the same code drives the HTTP backend in
//! production and the in-memory fixtures in tests. The pieces, leaves
//! first:
//!
//! - attribute definition cache and update building (`DefinitionCache`)
//! - name resolution for statuses, models and suppliers (`NameResolver`)
//! - the assignee and retirement workflows (`Reconciler`)
//! - cross-type attribute mapping and migration (`SchemaMapper`)
//! - bulk discovery, CSV ingestion, asset creation and run summaries

mod aql;
mod bulk;
mod create;
mod csvload;
mod definitions;
mod error;
mod mapper;
mod migrate;
mod profile;
mod reconcile;
mod resolve;
mod summary;

pub use bulk::{
    list_records_needing_assignee, list_records_needing_retirement, process_assignees,
    process_retirements,
};
pub use create::{normalize_date, AssetCreator, CreationResult, NewAssetInput};
pub use csvload::{normalize_serial, parse_serials, SerialBatch, SERIAL_COLUMN};
pub use definitions::DefinitionCache;
pub use error::{EngineError, ErrorCategory};
pub use mapper::{AttributeMapping, MappedAttribute, MigrationResult, SchemaMapper};
pub use migrate::{find_record_by_serial, migrate_batch, migrate_by_serial, MigrationRequest};
pub use profile::Profile;
pub use reconcile::{AssigneeResult, Reconciler, RetirementResult, RETIRED_STATUS};
pub use resolve::{NameResolver, SupplierRef};
pub use summary::{categorize_message, summarize, Outcome, Summary};
