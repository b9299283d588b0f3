//! Engine error taxonomy and the summary category tags.

use std::fmt;

use serde::Serialize;
use stocktake_store::{IdentityError, StoreError};

/// All errors the engine can surface to its callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// No attribute definition with this name on the object type.
    #[error("attribute not found: '{attribute}' on object type {object_type_id}")]
    AttributeNotFound {
        attribute: String,
        object_type_id: u64,
    },

    /// Status name does not match any allowed value of the attribute.
    #[error("status '{status}' not found; valid statuses: {}", .valid.join(", "))]
    StatusNotFound { status: String, valid: Vec<String> },

    /// Model name matched no catalogue entry, exactly or by substring.
    #[error("model '{model}' not found; known models include: {}", .known.join(", "))]
    ModelNotFound { model: String, known: Vec<String> },

    /// Model name substring-matched several distinct catalogue entries.
    #[error("model '{model}' is ambiguous; it matches: {}", .matches.join(", "))]
    ModelAmbiguous { model: String, matches: Vec<String> },

    /// Operator input rejected at the boundary.
    #[error("validation failed: {0}")]
    Validation(String),

    /// CSV input could not be read at all.
    #[error("csv parse failed: {0}")]
    Csv(#[from] csv::Error),

    /// The backend accepted a write the re-read does not reflect.
    #[error("update verification failed for {key}: {detail}")]
    UpdateVerification { key: String, detail: String },
}

/// Coarse operator-facing buckets used by the run summary. Tagged at the
/// point an error becomes a result, so the summarizer does not have to
/// guess from prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ErrorCategory {
    NotFound,
    PermissionDenied,
    RateLimited,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::NotFound => "Not Found",
            ErrorCategory::PermissionDenied => "Permission Denied",
            ErrorCategory::RateLimited => "Rate Limited",
            ErrorCategory::Other => "Other",
        };
        f.write_str(label)
    }
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Store(e) => match e {
                StoreError::RecordNotFound { .. }
                | StoreError::SchemaNotFound { .. }
                | StoreError::ObjectTypeNotFound { .. } => ErrorCategory::NotFound,
                StoreError::PermissionDenied { .. } => ErrorCategory::PermissionDenied,
                StoreError::RateLimited { .. } => ErrorCategory::RateLimited,
                StoreError::Auth(_) | StoreError::Backend { .. } => ErrorCategory::Other,
            },
            EngineError::Identity(e) => match e {
                IdentityError::AccountNotFound { .. } => ErrorCategory::NotFound,
                IdentityError::AmbiguousAccount { .. } | IdentityError::Backend(_) => {
                    ErrorCategory::Other
                }
            },
            EngineError::AttributeNotFound { .. }
            | EngineError::StatusNotFound { .. }
            | EngineError::ModelNotFound { .. } => ErrorCategory::NotFound,
            EngineError::ModelAmbiguous { .. }
            | EngineError::Validation(_)
            | EngineError::Csv(_)
            | EngineError::UpdateVerification { .. } => ErrorCategory::Other,
        }
    }
}
