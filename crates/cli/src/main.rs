mod catalog;
mod config;
mod create;
mod logging;
mod migrate;
mod reconcile;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use stocktake_engine::Summary;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Inventory bookkeeping toolkit.
#[derive(Parser)]
#[command(name = "stocktake", version, about = "Inventory bookkeeping toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the settings file (default: stocktake.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a record's assignee from its user email attribute
    Assign {
        /// Record key, e.g. HW-1042
        #[arg(required_unless_present = "bulk", conflicts_with = "bulk")]
        key: Option<String>,
        /// Process every record that has a user email but no assignee
        #[arg(long)]
        bulk: bool,
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Mark records whose retirement date has arrived as retired
    Retire {
        /// Record key, e.g. HW-1042
        #[arg(required_unless_present = "bulk", conflicts_with = "bulk")]
        key: Option<String>,
        /// Process every record due for retirement
        #[arg(long)]
        bulk: bool,
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Move records onto another object type, located by serial number
    Migrate {
        /// CSV file with a SERIAL_NUMBER column
        #[arg(long)]
        csv: PathBuf,
        /// Object type id the records live on now
        #[arg(long)]
        source_type: u64,
        /// Object type id to move them to
        #[arg(long)]
        target_type: u64,
        /// Write changes; without this flag the run is a dry-run
        #[arg(long)]
        execute: bool,
        /// Delete each source record before creating its replacement
        #[arg(long)]
        delete_original: bool,
    },

    /// Create an inventory record from operator input
    Create {
        /// Serial number of the new asset
        #[arg(long)]
        serial: String,
        /// Model name, matched against the model catalogue
        #[arg(long)]
        model: String,
        /// Status name, matched against the status attribute options
        #[arg(long)]
        status: String,
        /// Invoice number
        #[arg(long)]
        invoice: Option<String>,
        /// Purchase date, year-first or day-first with - or / separators
        #[arg(long)]
        purchase_date: Option<String>,
        /// Purchase cost
        #[arg(long)]
        cost: Option<String>,
        /// Colour
        #[arg(long)]
        colour: Option<String>,
        /// Supplier name; created on demand except under --dry-run
        #[arg(long)]
        supplier: Option<String>,
        /// Validate and resolve without creating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List model names in use on the managed object type
    Models,

    /// List the allowed status names
    Statuses,

    /// List supplier names
    Suppliers,

    /// List schemas and their object types with ids
    Types {
        /// Restrict the listing to one schema by name
        #[arg(long)]
        schema: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    let settings = match config::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(message) => {
            report_error(&message, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Assign { key, bulk, dry_run } => {
            reconcile::cmd_assign(key.as_deref(), bulk, dry_run, &settings, cli.output, cli.quiet);
        }
        Commands::Retire { key, bulk, dry_run } => {
            reconcile::cmd_retire(key.as_deref(), bulk, dry_run, &settings, cli.output, cli.quiet);
        }
        Commands::Migrate {
            csv,
            source_type,
            target_type,
            execute,
            delete_original,
        } => {
            migrate::cmd_migrate(
                migrate::MigrateOptions {
                    csv: &csv,
                    source_type,
                    target_type,
                    execute,
                    delete_original,
                    output: cli.output,
                    quiet: cli.quiet,
                },
                &settings,
            );
        }
        Commands::Create {
            serial,
            model,
            status,
            invoice,
            purchase_date,
            cost,
            colour,
            supplier,
            dry_run,
        } => {
            let input = stocktake_engine::NewAssetInput {
                serial,
                model,
                status,
                invoice,
                purchase_date,
                cost,
                colour,
                supplier,
            };
            create::cmd_create(&input, dry_run, &settings, cli.output, cli.quiet);
        }
        Commands::Models => {
            catalog::cmd_catalogue(catalog::Catalogue::Models, &settings, cli.output, cli.quiet);
        }
        Commands::Statuses => {
            catalog::cmd_catalogue(catalog::Catalogue::Statuses, &settings, cli.output, cli.quiet);
        }
        Commands::Suppliers => {
            catalog::cmd_catalogue(catalog::Catalogue::Suppliers, &settings, cli.output, cli.quiet);
        }
        Commands::Types { schema } => {
            catalog::cmd_types(schema.as_deref(), &settings, cli.output, cli.quiet);
        }
    }
}

/// Print an error to stderr in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}

/// Print one workflow result: pretty JSON, or the prepared text line.
pub(crate) fn render_one<T: serde::Serialize>(
    result: &T,
    line: &str,
    output: OutputFormat,
    quiet: bool,
) {
    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{}", line);
            }
        }
    }
}

/// Print a batch report: results plus summary as JSON, or one line per
/// record followed by the summary block.
pub(crate) fn render_batch<T: serde::Serialize>(
    results: &[T],
    lines: &[String],
    summary: &Summary,
    output: OutputFormat,
    quiet: bool,
) {
    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({ "results": results, "summary": summary });
            println!(
                "{}",
                serde_json::to_string_pretty(&body)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                for line in lines {
                    println!("{}", line);
                }
                print!("{}", summary);
            }
        }
    }
}

/// Exit with status 1 when any batch entry errored, 0 otherwise.
pub(crate) fn exit_for(summary: &Summary) -> ! {
    process::exit(if summary.errors > 0 { 1 } else { 0 });
}
