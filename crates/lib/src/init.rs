//! Initialize the configuration directory: create ~/.relai and a starter config.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Create the config directory and a starter config file if they do not exist.
/// The starter file is the default config serialized, so every tunable is
/// visible and credentials can be filled in (or left to the environment).
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = serde_json::to_string_pretty(&Config::default())
            .context("serializing default config")?;
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directory_and_starter_config() {
        let dir = std::env::temp_dir().join(format!("relai-init-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config_path = dir.join("config.json");

        init_config_dir(&config_path).expect("init");
        let written = std::fs::read_to_string(&config_path).expect("read starter config");
        let parsed: Config = serde_json::from_str(&written).expect("starter config parses");
        assert_eq!(parsed.gateway.port, Config::default().gateway.port);

        // Re-running must not overwrite.
        std::fs::write(&config_path, "{\"gateway\":{\"port\":1}}").expect("write marker");
        init_config_dir(&config_path).expect("init again");
        let kept = std::fs::read_to_string(&config_path).expect("read kept config");
        assert!(kept.contains("\"port\":1"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
