//! Scenario files for the `lightflow` binary.
//!
//! ```toml
//! [engine]
//! gamma = 2.8
//!
//! [engine.dim]
//! min_brightness = 50.0
//! brightness_step = 25.0
//!
//! [[lights]]
//! id = "a"
//! brightness = 255.0
//!
//! [[lights]]
//! id = "b"
//! brightness = 100.0
//! color_temp = 370
//!
//! [group]
//! name = "living"
//! members = ["a", "b"]
//!
//! [[pulses]]
//! direction = "dim"
//! count = 10
//! ```

use super::{EngineConfig, GroupConfig};
use crate::dim::DimDirection;
use crate::error::{LightError, Result, ResultExt};
use crate::types::{Parameters, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One simulated light and its starting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<i32>,
}

impl LightConfig {
    pub fn new(id: impl Into<String>, initial: Parameters) -> Self {
        Self {
            id: id.into(),
            brightness: initial.brightness,
            rgb: initial.rgb,
            color_temp: initial.color_temp,
        }
    }

    pub fn initial(&self) -> Parameters {
        Parameters {
            brightness: self.brightness,
            rgb: self.rgb,
            color_temp: self.color_temp,
        }
    }
}

fn default_count() -> u32 {
    1
}

fn default_interval_ms() -> u64 {
    500
}

/// A run of identical pulses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    pub direction: DimDirection,

    #[serde(default = "default_count")]
    pub count: u32,

    /// Virtual time between pulses
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Lights, one dim group and a pulse script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub engine: EngineConfig,

    pub lights: Vec<LightConfig>,

    pub group: GroupConfig,

    #[serde(default)]
    pub pulses: Vec<PulseConfig>,
}

impl ScenarioFile {
    /// Three lights dimmed all the way down and back up.
    pub fn demo() -> Self {
        let mut engine = EngineConfig::default();
        engine.dim.min_brightness = 50.0;
        engine.dim.brightness_step = 25.0;
        Self {
            engine,
            lights: vec![
                LightConfig::new("a", Parameters::with_brightness(255.0)),
                LightConfig::new("b", Parameters::with_brightness(100.0).color_temp(370)),
                LightConfig::new("c", Parameters::with_brightness(50.0).rgb((255, 180, 120))),
            ],
            group: GroupConfig {
                name: "living".to_string(),
                members: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                dim_order: Vec::new(),
            },
            pulses: vec![
                PulseConfig {
                    direction: DimDirection::Dim,
                    count: 12,
                    interval_ms: default_interval_ms(),
                },
                PulseConfig {
                    direction: DimDirection::Brighten,
                    count: 5,
                    interval_ms: default_interval_ms(),
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.group.validate()?;

        let mut ids = HashSet::new();
        for light in &self.lights {
            if !ids.insert(light.id.as_str()) {
                return Err(LightError::Config(format!("light '{}' is defined twice", light.id)));
            }
        }
        if let Some(unknown) = self.group.members.iter().find(|m| !ids.contains(m.as_str())) {
            return Err(LightError::Config(format!(
                "group '{}' names unknown light '{}'",
                self.group.name, unknown
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(LightError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }
}
