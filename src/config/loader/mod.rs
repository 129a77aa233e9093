use crate::config::BridgeConfig;
use crate::utils::get_nanobot_home;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_nanobot_home()?.join("whatsapp-bridge.json"))
}

/// Load and validate the bridge config. A missing file yields the defaults.
pub fn load_config(config_path: Option<&Path>) -> Result<BridgeConfig> {
    let default_path =
        get_config_path().unwrap_or_else(|_| PathBuf::from("whatsapp-bridge.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let config = if path.exists() {
        // Shared lock: concurrent readers are fine, writers hold an exclusive lock
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config at {}", path.display()))?;
        FileExt::lock_shared(&file)
            .with_context(|| "Failed to acquire shared lock on config file")?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str::<BridgeConfig>(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        BridgeConfig::default()
    };

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}
