//! Configuration loading

use std::path::Path;

use anyhow::Result;

use crate::Config;

/// Locate a config file, in priority order: the `GROUPKEYS_CONFIG_PATH`
/// environment variable, `./config.yaml`, then the `/config/config.yaml`
/// container mount. `None` means environment variables only.
fn find_config_file() -> Option<String> {
    std::env::var("GROUPKEYS_CONFIG_PATH")
        .ok()
        .into_iter()
        .chain(["config.yaml".to_string(), "/config/config.yaml".to_string()])
        .find(|p| Path::new(p).exists())
}

/// Load configuration from a config file and the environment.
///
/// A missing or unreadable file is not fatal: the service falls back to
/// environment variables as complemented by the defaults.
pub fn load_config() -> Result<Config> {
    let config = match find_config_file() {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path).unwrap_or_else(|e| {
                eprintln!("Failed to load {path}: {e}, falling back to environment");
                Config::from_env().unwrap_or_default()
            })
        }
        None => Config::from_env().unwrap_or_else(|e| {
            eprintln!("Failed to load config from environment: {e}, using defaults");
            Config::default()
        }),
    };

    Ok(config)
}
