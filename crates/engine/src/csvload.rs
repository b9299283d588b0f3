//! Serial-number CSV ingestion.
//!
//! Operator exports vary in shape, so parsing is deliberately
//! forgiving about rows (blank or malformed rows become warnings)
//! and strict about the one thing that matters: the required
//! `SERIAL_NUMBER` column must exist, or nothing can be processed.

use std::collections::HashSet;

use tracing::debug;

use crate::error::EngineError;

/// Required column name in migration CSV files.
pub const SERIAL_COLUMN: &str = "SERIAL_NUMBER";

/// Parsed serial batch: normalized, de-duplicated serials plus the
/// rows that were dropped along the way.
#[derive(Debug, Clone)]
pub struct SerialBatch {
    /// First-seen order, normalized.
    pub serials: Vec<String>,
    pub warnings: Vec<String>,
}

/// Canonical serial form: trimmed, upper-cased, all whitespace removed.
pub fn normalize_serial(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Parse CSV bytes into a serial batch.
///
/// A leading UTF-8 byte-order mark is tolerated. Duplicate serials
/// collapse to their first occurrence. A missing `SERIAL_NUMBER`
/// column is a hard error naming the columns that were found.
pub fn parse_serials(data: &[u8]) -> Result<SerialBatch, EngineError> {
    let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(SERIAL_COLUMN))
        .ok_or_else(|| {
            let found: Vec<&str> = headers.iter().map(str::trim).collect();
            EngineError::Validation(format!(
                "csv is missing the required {SERIAL_COLUMN} column, found: {}",
                found.join(", ")
            ))
        })?;

    let mut seen = HashSet::new();
    let mut batch = SerialBatch {
        serials: Vec::new(),
        warnings: Vec::new(),
    };

    for (index, row) in reader.records().enumerate() {
        // Header occupies row 1, data starts at row 2.
        let row_number = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                batch
                    .warnings
                    .push(format!("row {row_number}: unreadable, skipped ({err})"));
                continue;
            }
        };
        let serial = normalize_serial(row.get(column).unwrap_or(""));
        if serial.is_empty() {
            batch
                .warnings
                .push(format!("row {row_number}: empty serial, skipped"));
            continue;
        }
        if seen.insert(serial.clone()) {
            batch.serials.push(serial);
        } else {
            debug!(row_number, serial, "duplicate serial collapsed");
        }
    }

    debug!(
        serials = batch.serials.len(),
        warnings = batch.warnings.len(),
        "csv parsed"
    );
    Ok(batch)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
