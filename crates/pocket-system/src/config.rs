//! Loading [`RuntimeConfig`] through the storage collaborator.

use pocket_types::config::RuntimeConfig;
use pocket_types::error::{PocketError, Result};
use pocket_vfs::Vfs;

/// Default location of the runtime configuration file.
pub const CONFIG_PATH: &str = "/sd/pocket/config.toml";

/// Read the TOML file at `path`. A missing file yields the defaults.
pub fn load_config(vfs: &dyn Vfs, path: &str) -> Result<RuntimeConfig> {
    if !vfs.exists(path) {
        log::info!("no config at {path}, using defaults");
        return Ok(RuntimeConfig::default());
    }
    let bytes = vfs.read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| PocketError::Config(format!("{path}: not UTF-8: {e}")))?;
    let config = RuntimeConfig::from_toml_str(&text)?;
    log::info!("config loaded from {path}");
    Ok(config)
}
