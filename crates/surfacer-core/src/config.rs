//! Persistent configuration for surfacer.
//!
//! Stores tuning defaults in `~/.surfacer/config.json` so every test run and
//! CLI invocation scrolls the same way without repeating flags.
//!
//! # Example
//!
//! ```no_run
//! use surfacer_core::config::SurfacerConfig;
//!
//! // Load (returns defaults if the file doesn't exist)
//! let config = SurfacerConfig::load();
//! let options = config.reveal_options();
//! println!("max vertical swipe: {}", options.max_swipe_fraction.dy);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Vector;
use crate::obstruction::AppContext;
use crate::scroll::{RevealOptions, DEFAULT_HOLD_DURATION, DEFAULT_MAX_SWIPE_FRACTION};

const CONFIG_DIRNAME: &str = ".surfacer";
const CONFIG_FILENAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns `~/.surfacer`, if a home directory is known.
pub fn surfacer_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIRNAME))
}

/// Persistent surfacer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacerConfig {
    /// Horizontal cap on one swipe, as a fraction of the scrollable width.
    pub max_swipe_fraction_x: f64,
    /// Vertical cap on one swipe, as a fraction of the scrollable height.
    pub max_swipe_fraction_y: f64,
    /// Duration of each drag gesture in milliseconds.
    pub hold_duration_ms: u64,
    /// Minimum improvement per swipe, in points, before a search counts as
    /// stalled.
    pub stall_tolerance: f64,
    /// Wall-clock budget for one reveal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Where obstructions are looked up.
    pub app: AppContext,
}

impl Default for SurfacerConfig {
    fn default() -> Self {
        Self {
            max_swipe_fraction_x: DEFAULT_MAX_SWIPE_FRACTION.dx,
            max_swipe_fraction_y: DEFAULT_MAX_SWIPE_FRACTION.dy,
            hold_duration_ms: DEFAULT_HOLD_DURATION.as_millis() as u64,
            stall_tolerance: 0.0,
            timeout_ms: None,
            app: AppContext::default(),
        }
    }
}

impl SurfacerConfig {
    /// Load config from `~/.surfacer/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        surfacer_dir()
            .and_then(|dir| Self::load_from(dir.join(CONFIG_FILENAME)).ok())
            .unwrap_or_default()
    }

    /// Load config from a specific file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save config to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Search options described by this config, clamped the way
    /// [`RevealOptions::sanitized`] does.
    pub fn reveal_options(&self) -> RevealOptions {
        RevealOptions {
            max_swipe_fraction: Vector::new(self.max_swipe_fraction_x, self.max_swipe_fraction_y),
            hold_duration: Duration::from_millis(self.hold_duration_ms),
            stall_tolerance: self.stall_tolerance,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
        .sanitized()
    }
}
