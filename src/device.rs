//! Device capability consumed by the engine.
//!
//! Concrete platform adapters implement [`Device`]. The crate ships
//! [`SimulatedLight`] and [`DeviceGroup`] for tests and the demo binary.
//!
//! Groups are flattened into their leaves with [`flatten_leaves`], which
//! visits each leaf once and tolerates cycles in the child graph.

use crate::sync::lock;
use crate::types::{Parameters, Transition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Unique device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&DeviceId> for DeviceId {
    fn from(id: &DeviceId) -> Self {
        id.clone()
    }
}

/// A controllable light (or group of lights).
#[cfg_attr(test, mockall::automock)]
pub trait Device: Send + Sync {
    fn id(&self) -> DeviceId;

    /// Current state as last applied.
    fn parameters(&self) -> Parameters;

    fn apply_transition(&self, transition: &Transition);

    /// Member devices; empty for a leaf.
    fn children(&self) -> Vec<Arc<dyn Device>>;
}

/// Collect the leaf devices below `roots`, each once, in depth-first order.
pub fn flatten_leaves(roots: &[Arc<dyn Device>]) -> Vec<Arc<dyn Device>> {
    let mut visited = HashSet::new();
    let mut leaves = Vec::new();
    let mut stack: Vec<Arc<dyn Device>> = roots.iter().rev().cloned().collect();

    while let Some(device) = stack.pop() {
        if !visited.insert(device.id()) {
            continue;
        }
        let children = device.children();
        if children.is_empty() {
            leaves.push(device);
        } else {
            stack.extend(children.into_iter().rev());
        }
    }
    leaves
}

/// In-memory light that records every transition it receives.
pub struct SimulatedLight {
    id: DeviceId,
    state: Mutex<Parameters>,
    history: Mutex<Vec<Transition>>,
}

impl SimulatedLight {
    pub fn new(id: impl Into<DeviceId>, initial: Parameters) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(initial),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn off(id: impl Into<DeviceId>) -> Self {
        Self::new(id, Parameters::off())
    }

    pub fn brightness(&self) -> f64 {
        lock(&self.state).brightness_or_zero()
    }

    /// Every transition applied so far, oldest first.
    pub fn history(&self) -> Vec<Transition> {
        lock(&self.history).clone()
    }

    pub fn last_transition(&self) -> Option<Transition> {
        lock(&self.history).last().cloned()
    }
}

impl Device for SimulatedLight {
    fn id(&self) -> DeviceId {
        self.id.clone()
    }

    fn parameters(&self) -> Parameters {
        lock(&self.state).clone()
    }

    fn apply_transition(&self, transition: &Transition) {
        tracing::trace!("{} <- {}", self.id, transition);
        *lock(&self.state) = transition.parameters.clone();
        lock(&self.history).push(transition.clone());
    }

    fn children(&self) -> Vec<Arc<dyn Device>> {
        Vec::new()
    }
}

/// A device made of other devices. Applying a transition fans out to every
/// leaf.
pub struct DeviceGroup {
    id: DeviceId,
    members: Mutex<Vec<Arc<dyn Device>>>,
}

impl DeviceGroup {
    pub fn new(id: impl Into<DeviceId>, members: Vec<Arc<dyn Device>>) -> Self {
        Self {
            id: id.into(),
            members: Mutex::new(members),
        }
    }

    pub fn add(&self, member: Arc<dyn Device>) {
        lock(&self.members).push(member);
    }
}

impl Device for DeviceGroup {
    fn id(&self) -> DeviceId {
        self.id.clone()
    }

    /// State of the first leaf, or off for an empty group.
    fn parameters(&self) -> Parameters {
        let members = self.children();
        flatten_leaves(&members)
            .first()
            .map(|leaf| leaf.parameters())
            .unwrap_or_else(Parameters::off)
    }

    fn apply_transition(&self, transition: &Transition) {
        for leaf in flatten_leaves(&self.children()) {
            leaf.apply_transition(transition);
        }
    }

    fn children(&self) -> Vec<Arc<dyn Device>> {
        lock(&self.members).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(id: &str) -> Arc<dyn Device> {
        Arc::new(SimulatedLight::off(id))
    }

    fn ids(devices: &[Arc<dyn Device>]) -> Vec<String> {
        devices.iter().map(|d| d.id().to_string()).collect()
    }

    #[test]
    fn test_flatten_nested_groups() {
        let inner: Arc<dyn Device> = Arc::new(DeviceGroup::new("inner", vec![light("b"), light("c")]));
        let outer: Arc<dyn Device> = Arc::new(DeviceGroup::new("outer", vec![light("a"), inner, light("d")]));
        assert_eq!(ids(&flatten_leaves(&[outer])), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_flatten_visits_shared_leaf_once() {
        let shared = light("shared");
        let g1: Arc<dyn Device> = Arc::new(DeviceGroup::new("g1", vec![shared.clone()]));
        let g2: Arc<dyn Device> = Arc::new(DeviceGroup::new("g2", vec![shared]));
        assert_eq!(ids(&flatten_leaves(&[g1, g2])), vec!["shared"]);
    }

    #[test]
    fn test_flatten_survives_cycles() {
        let a = Arc::new(DeviceGroup::new("a", vec![light("leaf")]));
        let b: Arc<dyn Device> = Arc::new(DeviceGroup::new("b", vec![a.clone() as Arc<dyn Device>]));
        a.add(b.clone());
        assert_eq!(ids(&flatten_leaves(&[b])), vec!["leaf"]);
    }

    #[test]
    fn test_group_fans_out_transitions() {
        let a = Arc::new(SimulatedLight::off("a"));
        let b = Arc::new(SimulatedLight::off("b"));
        let group = DeviceGroup::new("g", vec![a.clone(), b.clone()]);
        group.apply_transition(&Transition::on());
        assert_eq!(a.brightness(), 255.0);
        assert_eq!(b.brightness(), 255.0);
        assert_eq!(group.parameters(), Parameters::on());
        assert_eq!(a.history().len(), 1);
    }

    #[test]
    fn test_flatten_queries_mock_children() {
        let mut mock = MockDevice::new();
        mock.expect_id().return_const(DeviceId::from("mock"));
        mock.expect_children().times(1).returning(Vec::new);
        let leaves = flatten_leaves(&[Arc::new(mock) as Arc<dyn Device>]);
        assert_eq!(ids(&leaves), vec!["mock"]);
    }
}
