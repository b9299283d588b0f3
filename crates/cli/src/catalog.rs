//! CLI catalogue subcommands: models, statuses, suppliers and types.
//!
//! Read-only listings an operator consults before feeding names into
//! `create` or type ids into `migrate`.

use std::process;

use stocktake_client::InventoryClient;
use stocktake_engine::{DefinitionCache, NameResolver};
use stocktake_store::{MemoryCache, RecordStore};

use crate::config::Settings;
use crate::{report_error, OutputFormat};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Catalogue {
    Models,
    Statuses,
    Suppliers,
}

pub(crate) fn cmd_catalogue(
    kind: Catalogue,
    settings: &Settings,
    output: OutputFormat,
    quiet: bool,
) -> ! {
    let connection = settings.connection();
    let store = InventoryClient::new(&connection);
    let defs = DefinitionCache::new(&store);
    let cache = MemoryCache::new();
    let resolver = NameResolver::new(&store, &defs, &cache, &settings.profile);

    let (label, listed) = match kind {
        Catalogue::Models => ("models", resolver.list_models()),
        Catalogue::Statuses => ("statuses", resolver.list_statuses()),
        Catalogue::Suppliers => ("suppliers", resolver.list_suppliers()),
    };
    let names = match listed {
        Ok(names) => names,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({ "catalogue": label, "names": names });
            println!(
                "{}",
                serde_json::to_string_pretty(&body)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                if names.is_empty() {
                    println!("no {} found", label);
                } else {
                    for name in &names {
                        println!("{}", name);
                    }
                }
            }
        }
    }
    process::exit(0);
}

pub(crate) fn cmd_types(
    schema_filter: Option<&str>,
    settings: &Settings,
    output: OutputFormat,
    quiet: bool,
) -> ! {
    let connection = settings.connection();
    let store = InventoryClient::new(&connection);

    let schemas = match store.get_schemas() {
        Ok(schemas) => schemas,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let selected = match schema_filter {
        Some(name) => {
            let found: Vec<_> = schemas.into_iter().filter(|s| s.name == name).collect();
            if found.is_empty() {
                report_error(&format!("schema not found: {}", name), output, quiet);
                process::exit(1);
            }
            found
        }
        None => schemas,
    };

    let mut listing = Vec::new();
    for schema in selected {
        let types = match store.get_object_types(schema.id) {
            Ok(types) => types,
            Err(e) => {
                report_error(&e.to_string(), output, quiet);
                process::exit(1);
            }
        };
        listing.push((schema, types));
    }

    match output {
        OutputFormat::Json => {
            let body: Vec<_> = listing
                .iter()
                .map(|(schema, types)| {
                    serde_json::json!({ "schema": schema, "object_types": types })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&body)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            if !quiet {
                for (schema, types) in &listing {
                    println!("{} (schema {})", schema.name, schema.id);
                    for object_type in types {
                        println!("  {} (type {})", object_type.name, object_type.id);
                    }
                }
            }
        }
    }
    process::exit(0);
}
