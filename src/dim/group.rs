//! Pulse-driven dimming of a device group.

use super::context::DimmingContext;
use super::coordinator::{DimAction, DimCoordinator, DimDirection};
use crate::config::DimSettings;
use crate::device::{flatten_leaves, Device, DeviceId};
use crate::error::{LightError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A set of lights dimmed as one logical dimmer.
pub struct DimGroup {
    coordinator: DimCoordinator,
    devices: HashMap<DeviceId, Arc<dyn Device>>,
}

impl DimGroup {
    /// `roots` are flattened into leaves; `dim_order` must name every leaf
    /// exactly once.
    pub fn new(roots: &[Arc<dyn Device>], dim_order: &[DeviceId], settings: DimSettings) -> Result<Self> {
        let leaves = flatten_leaves(roots);
        if leaves.is_empty() {
            return Err(LightError::Config("dim group has no devices".to_string()));
        }
        let members: Vec<DeviceId> = leaves.iter().map(|d| d.id()).collect();
        let coordinator = DimCoordinator::new(&members, dim_order, settings)?;
        let devices = leaves.into_iter().map(|d| (d.id(), d)).collect();
        Ok(Self { coordinator, devices })
    }

    pub fn coordinator(&self) -> &DimCoordinator {
        &self.coordinator
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Arc<dyn Device>> {
        self.devices.get(id)
    }

    /// Fresh snapshot of every device, in dim order.
    pub fn context(&self) -> DimmingContext {
        self.coordinator.snapshot(|id| {
            self.devices
                .get(id)
                .map(|d| d.parameters())
                .unwrap_or_default()
        })
    }

    /// Run one pulse and return the actions that were applied.
    ///
    /// All devices are judged against a single snapshot taken before any of
    /// them acts.
    pub fn pulse(&self, direction: DimDirection) -> Vec<(DeviceId, DimAction)> {
        let ctx = self.context();
        let decisions: Vec<(DeviceId, DimAction)> = self
            .coordinator
            .order()
            .iter()
            .filter_map(|id| self.coordinator.step(direction, &ctx, id).map(|a| (id.clone(), a)))
            .collect();

        for (id, action) in &decisions {
            if let (Some(device), Some(current)) = (self.devices.get(id), ctx.parameters(id)) {
                let transition = action.to_transition(current);
                tracing::debug!("{} pulse: {} -> {}", direction, id, transition);
                device.apply_transition(&transition);
            }
        }
        if decisions.is_empty() {
            tracing::debug!("{} pulse: no device acted", direction);
        }
        decisions
    }
}
