//! Workspace configuration file loading.

use std::path::Path;

use super::{
    CheckerSettings,
    ConfigError,
};

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".json-key-checker.json";

/// Loads settings from `.json-key-checker.json` at the workspace root.
///
/// # Returns
/// - `Ok(Some(settings))`: the file exists and parsed
/// - `Ok(None)`: no configuration file
/// - `Err(ConfigError)`: read or parse failure
pub(super) fn load_from_workspace(
    workspace_root: &Path,
) -> Result<Option<CheckerSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    CheckerSettings::from_value(value).map(Some)
}
