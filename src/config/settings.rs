//! Dimming and group settings.
//!
//! # Main Types
//!
//! - [`DimSettings`] - floor brightness and step size for dim/brighten pulses
//! - [`GroupConfig`] - a named group of lights and the order they dim in

use crate::dim::validate_dim_order;
use crate::error::{LightError, Result};
use crate::types::MAX_BRIGHTNESS;
use serde::{Deserialize, Serialize};

/// Dim/brighten pulse tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimSettings {
    /// Lowest brightness still counted as "on"
    pub min_brightness: f64,

    /// Brightness change per pulse
    pub brightness_step: f64,
}

impl Default for DimSettings {
    fn default() -> Self {
        Self {
            min_brightness: 2.0,
            brightness_step: 25.0,
        }
    }
}

impl DimSettings {
    pub fn new(min_brightness: f64, brightness_step: f64) -> Self {
        Self {
            min_brightness,
            brightness_step,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_brightness > 0.0 && self.min_brightness <= MAX_BRIGHTNESS) {
            return Err(LightError::Config(format!(
                "min_brightness must be in (0, 255], got {}",
                self.min_brightness
            )));
        }
        if !(self.brightness_step > 0.0 && self.brightness_step.is_finite()) {
            return Err(LightError::Config(format!(
                "brightness_step must be positive, got {}",
                self.brightness_step
            )));
        }
        Ok(())
    }
}

/// A named group of lights dimmed as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,

    /// Light IDs in the group
    pub members: Vec<String>,

    /// Order in which members turn off when dimming (defaults to `members`)
    #[serde(default)]
    pub dim_order: Vec<String>,
}

impl GroupConfig {
    /// The configured dim order, or the member order if none was given.
    pub fn effective_dim_order(&self) -> &[String] {
        if self.dim_order.is_empty() {
            &self.members
        } else {
            &self.dim_order
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(LightError::Config(format!("group '{}' has no members", self.name)));
        }
        validate_dim_order(&self.members[..], self.effective_dim_order())
            .map_err(|e| e.with_context(format!("group '{}'", self.name)))
    }
}
