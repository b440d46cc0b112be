//! Runtime configuration.
//!
//! Every field has a default so an absent or partial TOML file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PocketError, Result};

/// Root configuration table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub paths: PathConfig,
    pub system: SystemConfig,
    pub gui: GuiConfig,
    pub image: ImageConfig,
}

/// Filesystem layout on the storage card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub base: String,
    pub roms: String,
    pub saves: String,
    pub trace_file: String,
    pub screenshot: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            base: "/sd/pocket".to_string(),
            roms: "/sd/roms".to_string(),
            saves: "/sd/pocket/saves".to_string(),
            trace_file: "/sd/pocket/crash.log".to_string(),
            screenshot: "/sd/pocket/screenshot.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Name of the top-level launcher app.
    pub launcher: String,
    /// Boot target of "Reboot to firmware".
    pub factory_app: String,
    pub input_timeout_ms: u64,
    pub startup_grace_ms: u64,
    pub monitor_period_ms: u64,
    /// Wall-clock drift between two samples that counts as a jump.
    pub time_jump_secs: i64,
    /// Unix time used when no saved time exists.
    pub fallback_epoch: i64,
    pub log_ring_size: usize,
    pub spawn_monitor: bool,
    /// When false the game menu offers an "Options" entry instead.
    pub has_option_button: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            launcher: "launcher".to_string(),
            factory_app: "factory".to_string(),
            input_timeout_ms: 15_000,
            startup_grace_ms: 2_000,
            monitor_period_ms: 1_000,
            time_jump_secs: 60,
            fallback_epoch: 946_702_800,
            log_ring_size: 2048,
            spawn_monitor: true,
            has_option_button: true,
        }
    }
}

impl SystemConfig {
    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Sleep between two gamepad polls inside a dialog.
    pub poll_interval_ms: u64,
    /// Rows of the scratch buffer (its width is the larger screen side).
    pub scratch_rows: usize,
    /// Overrides the persisted font type when set.
    pub font_type: Option<usize>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            scratch_rows: 32,
            font_type: None,
        }
    }
}

impl GuiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Trailing bytes accepted after a raw image's pixel payload.
    pub raw_tolerance: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { raw_tolerance: 100 }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document. Missing tables and keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PocketError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.gui.scratch_rows == 0 {
            return Err(PocketError::Config("gui.scratch_rows must be > 0".to_string()));
        }
        if self.system.monitor_period_ms == 0 {
            return Err(PocketError::Config(
                "system.monitor_period_ms must be > 0".to_string(),
            ));
        }
        if self.system.log_ring_size == 0 {
            return Err(PocketError::Config("system.log_ring_size must be > 0".to_string()));
        }
        Ok(())
    }
}
