//! Test data builders for creating test objects

use lightflow::config::{DimSettings, EngineConfig};
use lightflow::device::{Device, DeviceId, SimulatedLight};
use lightflow::dim::DimGroup;
use lightflow::types::Parameters;
use std::sync::Arc;

/// Builder for a dim group of simulated lights
pub struct GroupBuilder {
    lights: Vec<(String, Parameters)>,
    order: Option<Vec<String>>,
    settings: DimSettings,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            order: None,
            settings: DimSettings::default(),
        }
    }

    pub fn light(mut self, id: &str, brightness: f64) -> Self {
        self.lights.push((id.to_string(), Parameters::with_brightness(brightness)));
        self
    }

    pub fn min_brightness(mut self, min: f64) -> Self {
        self.settings.min_brightness = min;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.settings.brightness_step = step;
        self
    }

    pub fn order(mut self, order: &[&str]) -> Self {
        self.order = Some(order.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn build(self) -> (DimGroup, Vec<Arc<SimulatedLight>>) {
        let lights: Vec<Arc<SimulatedLight>> = self
            .lights
            .iter()
            .map(|(id, p)| Arc::new(SimulatedLight::new(id.as_str(), p.clone())))
            .collect();
        let devices: Vec<Arc<dyn Device>> = lights.iter().map(|l| l.clone() as Arc<dyn Device>).collect();
        let order: Vec<DeviceId> = match self.order {
            Some(order) => order.into_iter().map(DeviceId::from).collect(),
            None => self.lights.iter().map(|(id, _)| DeviceId::from(id.as_str())).collect(),
        };
        let group = DimGroup::new(&devices, &order, self.settings).expect("valid test group");
        (group, lights)
    }
}

/// Builder for engine configs
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.idle_timeout_secs = Some(secs);
        self
    }

    pub fn dim(mut self, min: f64, step: f64) -> Self {
        self.config.dim = DimSettings::new(min, step);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_builder() {
        let (group, lights) = GroupBuilder::new().light("a", 10.0).light("b", 0.0).build();
        assert_eq!(group.len(), 2);
        assert_eq!(lights[0].brightness(), 10.0);
    }
}
