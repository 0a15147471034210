//! CLI configuration file support
//!
//! Loads configuration from ~/.config/genix/config.toml

use genix_core::OverlayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub tui: TuiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TuiConfig {
    /// Width of the chat panel when not maximized
    #[serde(default = "default_panel_width")]
    pub panel_width: u16,
    /// Open the chat panel on startup instead of showing the bubble
    #[serde(default)]
    pub start_open: bool,
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            panel_width: default_panel_width(),
            start_open: false,
            tick_rate_ms: default_tick_rate_ms(),
        }
    }
}

impl CliConfig {
    /// Read `path`; a missing file gives defaults, an unreadable or invalid
    /// one gives defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("Warning: Failed to parse config: {err}");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("Warning: Failed to read config: {err}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("genix")
            .join("config.toml")
    }
}

fn default_panel_width() -> u16 {
    64
}

fn default_tick_rate_ms() -> u64 {
    50
}
