//! Command implementations

pub mod completions;
pub mod host;
pub mod resolve;
pub mod verify;

use std::path::Path;

use anyhow::Result;
use keelson::Config;

/// Load the config file and environment overrides, anchored at the
/// directory holding the config file.
pub fn load_config(config_path: &Path) -> Result<Config> {
    let mut config = Config::load_or_default(config_path)?;
    config.apply_env();

    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    config.anchor_paths(&root);

    Ok(config)
}
