//! Run summaries across heterogeneous result types.
//!
//! Each workflow produces its own result struct; `Outcome` is the
//! least common denominator the summarizer needs. Error buckets come
//! from the explicit category tag when the result carries one and fall
//! back to sniffing the message text for results built from plain
//! strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::create::CreationResult;
use crate::error::ErrorCategory;
use crate::mapper::MigrationResult;
use crate::reconcile::{AssigneeResult, RetirementResult};

/// What the summarizer needs to know about one processed record.
pub trait Outcome {
    fn success(&self) -> bool;
    /// True only when a real write reached the backend.
    fn updated(&self) -> bool;
    fn skip_reason(&self) -> Option<&str>;
    fn error(&self) -> Option<&str>;
    fn category(&self) -> Option<ErrorCategory>;
}

impl Outcome for AssigneeResult {
    fn success(&self) -> bool {
        self.success
    }
    fn updated(&self) -> bool {
        self.updated
    }
    fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    fn category(&self) -> Option<ErrorCategory> {
        self.error_category
    }
}

impl Outcome for RetirementResult {
    fn success(&self) -> bool {
        self.success
    }
    fn updated(&self) -> bool {
        self.updated
    }
    fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    fn category(&self) -> Option<ErrorCategory> {
        self.error_category
    }
}

impl Outcome for MigrationResult {
    fn success(&self) -> bool {
        self.success
    }
    fn updated(&self) -> bool {
        self.success && !self.dry_run
    }
    fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    fn category(&self) -> Option<ErrorCategory> {
        self.error_category
    }
}

impl Outcome for CreationResult {
    fn success(&self) -> bool {
        self.success
    }
    fn updated(&self) -> bool {
        self.success && !self.dry_run
    }
    fn skip_reason(&self) -> Option<&str> {
        None
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    fn category(&self) -> Option<ErrorCategory> {
        self.error_category
    }
}

/// Aggregate of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Fraction of successful results, 0.0 to 1.0.
    pub success_rate: f64,
    pub skip_reasons: BTreeMap<String, usize>,
    pub error_categories: BTreeMap<String, usize>,
    pub generated_at: String,
}

/// Tally a batch of results into a summary.
pub fn summarize<T: Outcome>(results: &[T]) -> Summary {
    let mut summary = Summary {
        total: results.len(),
        successful: 0,
        updated: 0,
        skipped: 0,
        errors: 0,
        success_rate: 0.0,
        skip_reasons: BTreeMap::new(),
        error_categories: BTreeMap::new(),
        generated_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    };

    for result in results {
        if result.success() {
            summary.successful += 1;
        }
        if result.updated() {
            summary.updated += 1;
        }
        if let Some(reason) = result.skip_reason() {
            summary.skipped += 1;
            *summary.skip_reasons.entry(reason.to_string()).or_insert(0) += 1;
        }
        if let Some(error) = result.error() {
            summary.errors += 1;
            let category = result
                .category()
                .unwrap_or_else(|| categorize_message(error));
            *summary
                .error_categories
                .entry(category.to_string())
                .or_insert(0) += 1;
        }
    }
    if summary.total > 0 {
        summary.success_rate = summary.successful as f64 / summary.total as f64;
    }
    summary
}

/// Fallback classification for free-text error messages.
pub fn categorize_message(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    if lowered.contains("not found") {
        ErrorCategory::NotFound
    } else if lowered.contains("permission") || lowered.contains("denied") {
        ErrorCategory::PermissionDenied
    } else if lowered.contains("rate limit") {
        ErrorCategory::RateLimited
    } else {
        ErrorCategory::Other
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "processed {}: {} successful, {} updated, {} skipped, {} errors ({:.1}% success)",
            self.total,
            self.successful,
            self.updated,
            self.skipped,
            self.errors,
            self.success_rate * 100.0
        )?;
        if !self.skip_reasons.is_empty() {
            writeln!(f, "skip reasons:")?;
            for (reason, count) in &self.skip_reasons {
                writeln!(f, "  {count} x {reason}")?;
            }
        }
        if !self.error_categories.is_empty() {
            writeln!(f, "error categories:")?;
            for (category, count) in &self.error_categories {
                writeln!(f, "  {count} x {category}")?;
            }
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
