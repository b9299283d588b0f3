//! CLI assign and retire subcommands.
//!
//! Both come in two shapes: a single record named by key, or `--bulk`,
//! which discovers candidates with the engine's backlog queries and
//! reports a summary. Bulk runs exit non-zero when any record errored;
//! single runs exit non-zero when the record could not be processed.

use std::process;

use stocktake_client::{DirectoryClient, InventoryClient};
use stocktake_engine::{
    list_records_needing_assignee, list_records_needing_retirement, process_assignees,
    process_retirements, summarize, AssigneeResult, DefinitionCache, Reconciler, RetirementResult,
};

use crate::config::Settings;
use crate::{exit_for, render_batch, render_one, report_error, OutputFormat};

pub(crate) fn cmd_assign(
    key: Option<&str>,
    bulk: bool,
    dry_run: bool,
    settings: &Settings,
    output: OutputFormat,
    quiet: bool,
) {
    let connection = settings.connection();
    let store = InventoryClient::new(&connection);
    let identity = DirectoryClient::new(&connection);
    let defs = DefinitionCache::new(&store);
    let reconciler = Reconciler::new(&store, &identity, &defs, &settings.profile);

    if bulk {
        let records = match list_records_needing_assignee(&store, &settings.profile) {
            Ok(records) => records,
            Err(e) => {
                report_error(&e.to_string(), output, quiet);
                process::exit(1);
            }
        };
        let keys: Vec<String> = records.into_iter().map(|record| record.key).collect();
        let results = process_assignees(&reconciler, &keys, dry_run);
        let summary = summarize(&results);
        let lines: Vec<String> = results.iter().map(describe_assignee).collect();
        render_batch(&results, &lines, &summary, output, quiet);
        exit_for(&summary);
    }

    let Some(key) = key else {
        // clap enforces this; kept for callers other than the parser.
        report_error("a record key or --bulk is required", output, quiet);
        process::exit(1);
    };
    match reconciler.process_assignee(key, dry_run) {
        Ok(result) => render_one(&result, &describe_assignee(&result), output, quiet),
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn cmd_retire(
    key: Option<&str>,
    bulk: bool,
    dry_run: bool,
    settings: &Settings,
    output: OutputFormat,
    quiet: bool,
) {
    let connection = settings.connection();
    let store = InventoryClient::new(&connection);
    let identity = DirectoryClient::new(&connection);
    let defs = DefinitionCache::new(&store);
    let reconciler = Reconciler::new(&store, &identity, &defs, &settings.profile);

    if bulk {
        let records = match list_records_needing_retirement(&store, &settings.profile) {
            Ok(records) => records,
            Err(e) => {
                report_error(&e.to_string(), output, quiet);
                process::exit(1);
            }
        };
        let keys: Vec<String> = records.into_iter().map(|record| record.key).collect();
        let results = process_retirements(&reconciler, &keys, dry_run);
        let summary = summarize(&results);
        let lines: Vec<String> = results.iter().map(describe_retirement).collect();
        render_batch(&results, &lines, &summary, output, quiet);
        exit_for(&summary);
    }

    let Some(key) = key else {
        report_error("a record key or --bulk is required", output, quiet);
        process::exit(1);
    };
    match reconciler.process_retirement(key, dry_run) {
        Ok(result) => render_one(&result, &describe_retirement(&result), output, quiet),
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn describe_assignee(result: &AssigneeResult) -> String {
    if let Some(error) = &result.error {
        return format!("{}: error, {}", result.key, error);
    }
    if let Some(reason) = &result.skip_reason {
        return format!("{}: skipped, {}", result.key, reason);
    }
    let assignee = result.new_assignee.as_deref().unwrap_or("-");
    if result.dry_run {
        format!("{}: would assign {}", result.key, assignee)
    } else {
        format!("{}: assigned {}", result.key, assignee)
    }
}

fn describe_retirement(result: &RetirementResult) -> String {
    if let Some(error) = &result.error {
        return format!("{}: error, {}", result.key, error);
    }
    if let Some(reason) = &result.skip_reason {
        return format!("{}: skipped, {}", result.key, reason);
    }
    let from = result.current_status.as_deref().unwrap_or("-");
    let to = result.new_status.as_deref().unwrap_or("-");
    if result.dry_run {
        format!("{}: would retire, status {} -> {}", result.key, from, to)
    } else {
        format!("{}: retired, status {} -> {}", result.key, from, to)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
