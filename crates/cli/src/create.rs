//! CLI create subcommand.
//!
//! Hands validated operator input to the asset creator. Exit status
//! follows the result payload since creation failures are reported
//! there rather than raised.

use std::process;

use stocktake_client::InventoryClient;
use stocktake_engine::{AssetCreator, CreationResult, DefinitionCache, NameResolver, NewAssetInput};
use stocktake_store::MemoryCache;

use crate::config::Settings;
use crate::{render_one, OutputFormat};

pub(crate) fn cmd_create(
    input: &NewAssetInput,
    dry_run: bool,
    settings: &Settings,
    output: OutputFormat,
    quiet: bool,
) -> ! {
    let connection = settings.connection();
    let store = InventoryClient::new(&connection);
    let defs = DefinitionCache::new(&store);
    let cache = MemoryCache::new();
    let resolver = NameResolver::new(&store, &defs, &cache, &settings.profile);
    let creator = AssetCreator::new(&store, &defs, &resolver, &settings.profile);

    let result = creator.create_asset(input, dry_run);
    render_one(&result, &describe_creation(&result), output, quiet);
    process::exit(if result.success { 0 } else { 1 });
}

fn describe_creation(result: &CreationResult) -> String {
    let mut line = if let Some(error) = &result.error {
        format!("{}: error, {}", result.serial, error)
    } else if result.dry_run {
        format!("{}: dry-run ok", result.serial)
    } else {
        match &result.key {
            Some(key) => format!("{}: created {}", result.serial, key),
            None => format!("{}: created", result.serial),
        }
    };
    for note in &result.notes {
        line.push_str("\n  ");
        line.push_str(note);
    }
    line
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
