//! Bulk discovery and batch processing.
//!
//! Batch loops guarantee error isolation: a failure while processing
//! one record becomes that record's error result and the rest of the
//! batch continues untouched.

use tracing::{debug, info, warn};

use stocktake_core::Record;
use stocktake_store::{RecordStore, StoreError};

use crate::aql;
use crate::error::EngineError;
use crate::profile::Profile;
use crate::reconcile::{AssigneeResult, Reconciler, RetirementResult, RETIRED_STATUS};

/// Page size for discovery queries.
const DISCOVERY_PAGE_SIZE: usize = 50;
/// Runaway guard on pagination loops.
const MAX_PAGES: usize = 100;

/// Fetch every page of a query until a short page, bounded by a hard
/// page cap.
pub(crate) fn collect_query(
    store: &dyn RecordStore,
    query: &str,
    page_size: usize,
) -> Result<Vec<Record>, StoreError> {
    let mut records = Vec::new();
    let mut offset = 0;
    let mut pages = 0;
    loop {
        let page = store.find_by_query(query, offset, page_size)?;
        let fetched = page.values.len();
        records.extend(page.values);
        debug!(query, fetched, total = page.total, "query page fetched");
        pages += 1;
        if fetched < page_size || records.len() >= page.total {
            break;
        }
        if pages >= MAX_PAGES {
            warn!(query, pages, "pagination stopped at page cap");
            break;
        }
        offset += fetched;
    }
    Ok(records)
}

/// Records of the managed type that have a user email but no assignee.
pub fn list_records_needing_assignee(
    store: &dyn RecordStore,
    profile: &Profile,
) -> Result<Vec<Record>, EngineError> {
    let query = aql::object_type(&profile.object_type);
    let candidates = collect_query(store, &query, DISCOVERY_PAGE_SIZE)?;
    let scanned = candidates.len();

    let mut needing = Vec::new();
    for candidate in candidates {
        // Query rows can be attribute-sparse; judge on the complete record.
        let record = match store.get_by_key(&candidate.key) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %candidate.key, error = %err, "skipping record that failed to fetch");
                continue;
            }
        };
        if nonblank(&record, &profile.user_email_attribute)
            && !nonblank(&record, &profile.assignee_attribute)
        {
            needing.push(record);
        }
    }
    info!(scanned, needing = needing.len(), "assignee discovery complete");
    Ok(needing)
}

/// Records with a retirement date whose status is not yet Retired.
pub fn list_records_needing_retirement(
    store: &dyn RecordStore,
    profile: &Profile,
) -> Result<Vec<Record>, EngineError> {
    let query = aql::all(&[
        aql::object_type(&profile.object_type),
        aql::attr_not_empty(&profile.retirement_date_attribute),
    ]);
    let candidates = collect_query(store, &query, DISCOVERY_PAGE_SIZE)?;
    let scanned = candidates.len();

    let mut needing = Vec::new();
    for candidate in candidates {
        let record = match store.get_by_key(&candidate.key) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %candidate.key, error = %err, "skipping record that failed to fetch");
                continue;
            }
        };
        let status = record
            .value_by_name(&profile.status_attribute)
            .map(|e| e.to_display());
        if nonblank(&record, &profile.retirement_date_attribute)
            && status.as_deref() != Some(RETIRED_STATUS)
        {
            needing.push(record);
        }
    }
    info!(scanned, needing = needing.len(), "retirement discovery complete");
    Ok(needing)
}

/// Run the assignee workflow over many keys.
pub fn process_assignees(
    reconciler: &Reconciler<'_>,
    keys: &[String],
    dry_run: bool,
) -> Vec<AssigneeResult> {
    keys.iter()
        .map(|key| match reconciler.process_assignee(key, dry_run) {
            Ok(result) => result,
            Err(err) => {
                warn!(key = %key, error = %err, "assignee workflow failed");
                AssigneeResult::from_error(key, dry_run, &err)
            }
        })
        .collect()
}

/// Run the retirement workflow over many keys.
pub fn process_retirements(
    reconciler: &Reconciler<'_>,
    keys: &[String],
    dry_run: bool,
) -> Vec<RetirementResult> {
    keys.iter()
        .map(|key| match reconciler.process_retirement(key, dry_run) {
            Ok(result) => result,
            Err(err) => {
                warn!(key = %key, error = %err, "retirement workflow failed");
                RetirementResult::from_error(key, dry_run, &err)
            }
        })
        .collect()
}

fn nonblank(record: &Record, attribute: &str) -> bool {
    record
        .value_by_name(attribute)
        .map(|e| !e.primary().trim().is_empty())
        .unwrap_or(false)
}
