//! CLI migrate subcommand.
//!
//! Reads a serial-number CSV, locates each record on the source object
//! type and rebuilds it on the target type. Dry-run is the default;
//! `--execute` writes. CSV warnings (duplicates, blank rows) surface on
//! stderr in text mode and inside the JSON body otherwise.

use std::path::Path;
use std::process;

use stocktake_client::InventoryClient;
use stocktake_engine::{
    migrate_batch, parse_serials, summarize, DefinitionCache, MigrationRequest, MigrationResult,
};

use crate::config::Settings;
use crate::{exit_for, report_error, OutputFormat};

/// Options for the `stocktake migrate` command.
pub(crate) struct MigrateOptions<'a> {
    pub csv: &'a Path,
    pub source_type: u64,
    pub target_type: u64,
    pub execute: bool,
    pub delete_original: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_migrate(opts: MigrateOptions<'_>, settings: &Settings) -> ! {
    let MigrateOptions {
        csv,
        source_type,
        target_type,
        execute,
        delete_original,
        output,
        quiet,
    } = opts;

    let data = match std::fs::read(csv) {
        Ok(data) => data,
        Err(e) => {
            report_error(
                &format!("could not read csv '{}': {}", csv.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let batch = match parse_serials(&data) {
        Ok(batch) => batch,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    if output == OutputFormat::Text && !quiet {
        for warning in &batch.warnings {
            eprintln!("warning: {}", warning);
        }
    }
    if batch.serials.is_empty() {
        report_error("csv contained no usable serial numbers", output, quiet);
        process::exit(1);
    }

    let connection = settings.connection();
    let store = InventoryClient::new(&connection);
    let defs = DefinitionCache::new(&store);
    let request = MigrationRequest {
        source_type_id: source_type,
        target_type_id: target_type,
        delete_original,
        dry_run: !execute,
    };
    let results = migrate_batch(&store, &defs, &settings.profile, &batch.serials, request);
    let summary = summarize(&results);

    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "warnings": batch.warnings,
                "results": results,
                "summary": summary,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&body)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                for result in &results {
                    println!("{}", describe_migration(result));
                }
                print!("{}", summary);
            }
        }
    }
    exit_for(&summary)
}

fn describe_migration(result: &MigrationResult) -> String {
    let serial = result.serial.as_deref().unwrap_or(&result.source_key);
    if let Some(error) = &result.error {
        return format!("{}: error, {}", serial, error);
    }
    if let Some(reason) = &result.skip_reason {
        return format!("{}: skipped, {}", serial, reason);
    }
    if result.dry_run {
        format!(
            "{}: would migrate {}, {} attributes map",
            serial, result.source_key, result.mapped_attribute_count
        )
    } else {
        let new_key = result.new_key.as_deref().unwrap_or("-");
        format!("{}: migrated {} -> {}", serial, result.source_key, new_key)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
