//! Log initialization.
//!
//! Filtering follows `RUST_LOG` when set. Otherwise the workflow crates
//! log at info, dropped to warn under `--quiet`. Logs go to stderr so
//! stdout stays machine-readable for `--output json`.

use tracing_subscriber::EnvFilter;

pub(crate) fn init(quiet: bool) {
    let default_filter = if quiet {
        "stocktake_cli=warn,stocktake_engine=warn,stocktake_client=warn,stocktake_store=warn"
    } else {
        "stocktake_cli=info,stocktake_engine=info,stocktake_client=info,stocktake_store=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
