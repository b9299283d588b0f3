//! Per-record reconciliation workflows: assignee and retirement.
//!
//! Both walk the same shape: fetch, extract the trigger attribute, skip
//! when it is absent, skip when the desired state already holds, then
//! build and persist an update and verify the re-read. Skips are benign
//! non-action, distinct from errors; a missing record key is always a
//! loud error because it means operator input was wrong.

use serde::Serialize;
use tracing::{debug, info, warn};

use stocktake_store::{IdentityError, IdentityStore, RecordStore};

use crate::definitions::DefinitionCache;
use crate::error::{EngineError, ErrorCategory};
use crate::profile::Profile;

/// Terminal status written and verified by the retirement workflow.
pub const RETIRED_STATUS: &str = "Retired";

/// Outcome of one assignee reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct AssigneeResult {
    pub key: String,
    pub success: bool,
    pub updated: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub error_category: Option<ErrorCategory>,
    pub dry_run: bool,
    pub user_email: Option<String>,
    pub account_id: Option<String>,
    pub current_assignee: Option<String>,
    pub new_assignee: Option<String>,
}

impl AssigneeResult {
    /// Blank result with every outcome field unset.
    pub fn new(key: &str, dry_run: bool) -> Self {
        AssigneeResult {
            key: key.to_string(),
            success: false,
            updated: false,
            skipped: false,
            skip_reason: None,
            error: None,
            error_category: None,
            dry_run,
            user_email: None,
            account_id: None,
            current_assignee: None,
            new_assignee: None,
        }
    }

    fn skip(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!(key = %self.key, reason = %reason, "assignee workflow skipped");
        self.skipped = true;
        self.skip_reason = Some(reason);
        self
    }

    /// Error-result form used by bulk loops, which must not let one
    /// record's failure abort the batch.
    pub fn from_error(key: &str, dry_run: bool, error: &EngineError) -> Self {
        let mut result = AssigneeResult::new(key, dry_run);
        result.error = Some(error.to_string());
        result.error_category = Some(error.category());
        result
    }
}

/// Outcome of one retirement reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct RetirementResult {
    pub key: String,
    pub success: bool,
    pub updated: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub error_category: Option<ErrorCategory>,
    pub dry_run: bool,
    pub retirement_date: Option<String>,
    pub current_status: Option<String>,
    pub new_status: Option<String>,
}

impl RetirementResult {
    /// Blank result with every outcome field unset.
    pub fn new(key: &str, dry_run: bool) -> Self {
        RetirementResult {
            key: key.to_string(),
            success: false,
            updated: false,
            skipped: false,
            skip_reason: None,
            error: None,
            error_category: None,
            dry_run,
            retirement_date: None,
            current_status: None,
            new_status: None,
        }
    }

    fn skip(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!(key = %self.key, reason = %reason, "retirement workflow skipped");
        self.skipped = true;
        self.skip_reason = Some(reason);
        self
    }

    pub fn from_error(key: &str, dry_run: bool, error: &EngineError) -> Self {
        let mut result = RetirementResult::new(key, dry_run);
        result.error = Some(error.to_string());
        result.error_category = Some(error.category());
        result
    }
}

pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    identity: &'a dyn IdentityStore,
    defs: &'a DefinitionCache<'a>,
    profile: &'a Profile,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        identity: &'a dyn IdentityStore,
        defs: &'a DefinitionCache<'a>,
        profile: &'a Profile,
    ) -> Self {
        Reconciler {
            store,
            identity,
            defs,
            profile,
        }
    }

    /// Reconcile one record's assignee from its user-email attribute.
    ///
    /// Returns `Ok` with a skip for the benign non-action paths and
    /// raises for a missing record or a failed update verification, so
    /// single-record callers can halt while bulk loops convert to error
    /// results.
    pub fn process_assignee(&self, key: &str, dry_run: bool) -> Result<AssigneeResult, EngineError> {
        let record = self.store.get_by_key(key)?;
        let mut result = AssigneeResult::new(key, dry_run);

        let email = match record.value_by_name(&self.profile.user_email_attribute) {
            Some(extracted) => extracted.primary().trim().to_lowercase(),
            None => {
                return Ok(result.skip(format!(
                    "no {} attribute",
                    self.profile.user_email_attribute
                )))
            }
        };
        if email.is_empty() {
            return Ok(result.skip(format!(
                "no {} attribute",
                self.profile.user_email_attribute
            )));
        }
        result.user_email = Some(email.clone());

        result.current_assignee = record
            .value_by_name(&self.profile.assignee_attribute)
            .map(|e| e.to_display());
        debug!(
            key,
            email,
            current = result.current_assignee.as_deref().unwrap_or("-"),
            "assignee state extracted"
        );

        let account = match self.identity.find_account_by_email(&email) {
            Ok(account) => account,
            Err(err @ IdentityError::AccountNotFound { .. })
            | Err(err @ IdentityError::AmbiguousAccount { .. }) => {
                return Ok(result.skip(format!("user lookup failed: {err}")));
            }
            Err(err) => return Err(err.into()),
        };
        result.account_id = Some(account.account_id.clone());

        let active = match self.identity.is_account_active(&account.account_id) {
            Ok(active) => active,
            Err(err) => {
                warn!(key, account = %account.account_id, error = %err, "active check failed");
                false
            }
        };
        if !active {
            return Ok(result.skip(format!(
                "account {} is invalid or inactive",
                account.account_id
            )));
        }

        if result.current_assignee.as_deref() == Some(account.account_id.as_str()) {
            return Ok(result.skip(format!("Assignee already set to {}", account.account_id)));
        }

        result.new_assignee = Some(account.account_id.clone());
        if dry_run {
            info!(key, account = %account.account_id, "dry run: assignee update not persisted");
            result.success = true;
            return Ok(result);
        }

        let update = self.defs.build_update(
            record.object_type_id,
            &self.profile.assignee_attribute,
            &account.account_id,
        )?;
        let updated = self.store.update(&record.id, &[update])?;

        // The backend renders account ids as display names, so an exact
        // compare is unreliable; only require that some value now exists.
        if updated
            .value_by_name(&self.profile.assignee_attribute)
            .is_none()
        {
            return Err(EngineError::UpdateVerification {
                key: key.to_string(),
                detail: "assignee attribute is still empty after update".to_string(),
            });
        }

        info!(key, account = %account.account_id, "assignee updated");
        result.success = true;
        result.updated = true;
        Ok(result)
    }

    /// Retire one record when its retirement-date attribute is set.
    pub fn process_retirement(
        &self,
        key: &str,
        dry_run: bool,
    ) -> Result<RetirementResult, EngineError> {
        let record = self.store.get_by_key(key)?;
        let mut result = RetirementResult::new(key, dry_run);

        let date = match record.value_by_name(&self.profile.retirement_date_attribute) {
            Some(extracted) => extracted.to_display(),
            None => {
                return Ok(result.skip(format!(
                    "no {} attribute",
                    self.profile.retirement_date_attribute
                )))
            }
        };
        result.retirement_date = Some(date);

        result.current_status = record
            .value_by_name(&self.profile.status_attribute)
            .map(|e| e.to_display());
        if result.current_status.as_deref() == Some(RETIRED_STATUS) {
            return Ok(result.skip(format!("status already {RETIRED_STATUS}")));
        }

        result.new_status = Some(RETIRED_STATUS.to_string());
        if dry_run {
            info!(key, "dry run: status update not persisted");
            result.success = true;
            return Ok(result);
        }

        let update = self.defs.build_update(
            record.object_type_id,
            &self.profile.status_attribute,
            RETIRED_STATUS,
        )?;
        let updated = self.store.update(&record.id, &[update])?;

        // Unlike assignee, the written value is a plain status name, so
        // the re-read must echo it exactly.
        let observed = updated
            .value_by_name(&self.profile.status_attribute)
            .and_then(|e| e.scalar().map(str::to_string));
        if observed.as_deref() != Some(RETIRED_STATUS) {
            return Err(EngineError::UpdateVerification {
                key: key.to_string(),
                detail: format!(
                    "status reads '{}' after update, expected '{RETIRED_STATUS}'",
                    observed.as_deref().unwrap_or("")
                ),
            });
        }

        info!(key, "record retired");
        result.success = true;
        result.updated = true;
        Ok(result)
    }
}
