use serde::{Deserialize, Serialize};

use stocktake_core::{AttributeDefinition, AttributeUpdate, ObjectType, Record, Schema};

use crate::error::{IdentityError, StoreError};

/// One page of an attribute query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPage {
    pub values: Vec<Record>,
    /// Total matches across all pages, as reported by the backend.
    pub total: usize,
}

/// The inventory backend contract.
///
/// ## Blocking semantics
///
/// All calls block until the backend answers; the whole toolkit is
/// single-threaded and sequential. Implementations own any request
/// throttling (the HTTP client enforces a minimum inter-call interval
/// derived from a calls-per-minute budget, global per client instance).
///
/// ## Pagination
///
/// `find_by_query` takes caller-managed offset/limit; callers detect the
/// last page by a short page, cross-checked against `QueryPage::total`.
pub trait RecordStore {
    /// Fetch a complete record by its human-readable key.
    ///
    /// Returns `Err(StoreError::RecordNotFound)` if no record has the key.
    fn get_by_key(&self, key: &str) -> Result<Record, StoreError>;

    /// Run an AQL query and return one page of matching records.
    fn find_by_query(&self, query: &str, offset: usize, limit: usize)
        -> Result<QueryPage, StoreError>;

    /// Create a record of the given object type and return it.
    fn create(&self, object_type_id: u64, attributes: &[AttributeUpdate])
        -> Result<Record, StoreError>;

    /// Replace attribute values on an existing record, addressed by its
    /// opaque id. Returns the record as the backend sees it afterwards.
    fn update(&self, id: &str, updates: &[AttributeUpdate]) -> Result<Record, StoreError>;

    /// Delete a record by opaque id. `Ok(false)` means the record was
    /// already gone.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// All schemas visible in the workspace.
    fn get_schemas(&self) -> Result<Vec<Schema>, StoreError>;

    /// Object types of one schema.
    fn get_object_types(&self, schema_id: u64) -> Result<Vec<ObjectType>, StoreError>;

    /// Attribute definitions of one object type. Callers cache these per
    /// object type for the session; the backend treats them as read-only.
    fn get_attribute_definitions(
        &self,
        object_type_id: u64,
    ) -> Result<Vec<AttributeDefinition>, StoreError>;
}

/// A directory account, as the identity backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub active: bool,
    pub account_type: Option<String>,
}

/// The identity backend contract.
pub trait IdentityStore {
    /// Resolve an email to exactly one account.
    ///
    /// Returns `Err(IdentityError::AccountNotFound)` when nothing matches
    /// the email exactly, and `Err(IdentityError::AmbiguousAccount)` when
    /// several exact matches exist and none is preferentially typed.
    fn find_account_by_email(&self, email: &str) -> Result<Account, IdentityError>;

    /// Whether an account id refers to an active account. Unknown ids
    /// answer `Ok(false)` rather than erroring; an unknown assignee is a
    /// skip condition, not a failure.
    fn is_account_active(&self, account_id: &str) -> Result<bool, IdentityError>;
}
