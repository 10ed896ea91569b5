//! Configuration module for lightflow
//!
//! This module handles engine configuration including:
//! - Transition tuning (default transition time, gamma)
//! - Group dimming settings (minimum brightness, step size)
//! - Idle timeout
//! - Scenario files consumed by the `lightflow` binary
//!
//! Configuration is TOML. Everything is validated when it is loaded, so a
//! bad value surfaces to whoever assembles the pipelines instead of at the
//! first runtime tick.
//!
//! # Location
//!
//! The default engine config lives in the platform config directory:
//! - **Linux**: `~/.config/lightflow/config.toml`
//! - **macOS**: `~/Library/Application Support/lightflow/config.toml`
//! - **Windows**: `%APPDATA%\lightflow\config.toml`
//!
//! # Example
//!
//! ```toml
//! default_transition_ms = 500
//! gamma = 2.8
//! idle_timeout_secs = 300
//!
//! [dim]
//! min_brightness = 2.0
//! brightness_step = 25.0
//! ```

pub mod scenario;
pub mod settings;

pub use scenario::{LightConfig, PulseConfig, ScenarioFile};
pub use settings::{DimSettings, GroupConfig};

use crate::color::DEFAULT_GAMMA;
use crate::error::{LightError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "lightflow";

/// Engine config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Transitions ending sooner than this are applied instantly, and a resumed
/// transition shows its catch-up frame for this long
pub const DEFAULT_TRANSITION_MS: u64 = 500;

/// Engine-wide settings shared by every pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Short-transition threshold and catch-up delay in milliseconds
    pub default_transition_ms: u64,

    /// Gamma exponent for RGB blending
    pub gamma: f64,

    /// Group dimming settings
    pub dim: DimSettings,

    /// Revert to off after this many idle seconds (None = never)
    pub idle_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_transition_ms: DEFAULT_TRANSITION_MS,
            gamma: DEFAULT_GAMMA,
            dim: DimSettings::default(),
            idle_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn default_transition_time(&self) -> Duration {
        Duration::from_millis(self.default_transition_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(LightError::Config(format!(
                "gamma must be a positive number, got {}",
                self.gamma
            )));
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(LightError::Config(
                "idle_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.dim.validate()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(LightError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load from the default location, returning defaults on any error.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Write the config as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LightError::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// `<config_dir>/lightflow/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }
}
