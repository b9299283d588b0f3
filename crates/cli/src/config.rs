//! Settings file loading.
//!
//! Settings live in a TOML file: a `[connection]` table for backend
//! endpoints and credentials, and an optional `[profile]` table for
//! schema and attribute naming. Every field has a default, so a minimal
//! file only carries the connection. The API token may come from the
//! `STOCKTAKE_TOKEN` environment variable instead, which wins over the
//! file when both are set.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use stocktake_client::{Connection, DEFAULT_REQUESTS_PER_MINUTE};
use stocktake_engine::Profile;

/// Settings filename looked up in the working directory when no
/// `--config` path is given.
pub(crate) const DEFAULT_SETTINGS_FILE: &str = "stocktake.toml";

/// Environment variable overriding `connection.token`.
pub(crate) const TOKEN_ENV_VAR: &str = "STOCKTAKE_TOKEN";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub connection: ConnectionSettings,
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ConnectionSettings {
    pub base_url: String,
    pub workspace_id: String,
    pub email: Option<String>,
    pub token: String,
    pub max_requests_per_minute: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            base_url: String::new(),
            workspace_id: String::new(),
            email: None,
            token: String::new(),
            max_requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

impl Settings {
    /// Build the client connection from the loaded settings.
    pub(crate) fn connection(&self) -> Connection {
        Connection {
            base_url: self.connection.base_url.clone(),
            workspace_id: self.connection.workspace_id.clone(),
            email: self.connection.email.clone(),
            token: self.connection.token.clone(),
            max_requests_per_minute: self.connection.max_requests_per_minute,
        }
    }
}

/// Load and validate settings. An explicitly given path must exist; the
/// default file may be absent, in which case defaults apply and
/// validation reports what is missing.
pub(crate) fn load(path: Option<&Path>) -> Result<Settings, String> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                read_file(default_path)?
            } else {
                debug!("no settings file found, starting from defaults");
                Settings::default()
            }
        }
    };

    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            debug!("api token taken from {TOKEN_ENV_VAR}");
            settings.connection.token = token;
        }
    }

    // The profile's cache tenant defaults to the workspace id.
    if settings.profile.workspace.is_empty() {
        settings.profile.workspace = settings.connection.workspace_id.clone();
    }

    validate(&settings)?;
    Ok(settings)
}

fn read_file(path: &Path) -> Result<Settings, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read settings file '{}': {}", path.display(), e))?;
    toml::from_str(&text)
        .map_err(|e| format!("could not parse settings file '{}': {}", path.display(), e))
}

fn validate(settings: &Settings) -> Result<(), String> {
    let connection = &settings.connection;
    let mut missing = Vec::new();
    if connection.base_url.trim().is_empty() {
        missing.push("connection.base_url");
    }
    if connection.workspace_id.trim().is_empty() {
        missing.push("connection.workspace_id");
    }
    if connection.token.trim().is_empty() {
        missing.push("connection.token (or STOCKTAKE_TOKEN)");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "settings are incomplete, missing: {}. Pass --config or create {} in the working directory.",
            missing.join(", "),
            DEFAULT_SETTINGS_FILE
        ))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
