//! Stateful dimming for values produced inside a pipeline.
//!
//! [`DimmerNode`] steps its own output relative to a baseline captured at
//! the first pulse, counting pulses in a signed step counter. The minimum
//! brightness is always visited exactly once on the way to or from zero,
//! even when the step does not divide the distance evenly. A pulse that
//! would not change the brightness leaves the counter alone, so repeated
//! pulses at a limit never emit the same value twice.
//!
//! [`DimmerGroup`] arbitrates several dimmer nodes with a
//! [`DimCoordinator`], judging all of them against one snapshot of their
//! outputs per pulse.

use crate::config::DimSettings;
use crate::device::DeviceId;
use crate::dim::{DimCoordinator, DimDirection, DimmingContext};
use crate::error::{LightError, Result};
use crate::pipeline::node::{NodeContext, NodeCore, PipelineNode};
use crate::pipeline::observable::Subject;
use crate::sync::lock;
use crate::types::{Parameters, Transition, MAX_BRIGHTNESS};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Brightness `steps` pulses away from `baseline`.
///
/// Negative steps dim, positive steps brighten.
pub fn stepped_brightness(settings: &DimSettings, baseline: f64, steps: i32) -> f64 {
    let min = settings.min_brightness;
    let step = settings.brightness_step;
    let n = f64::from(steps.unsigned_abs());

    match steps.cmp(&0) {
        Ordering::Equal => baseline,
        Ordering::Less if baseline > min => {
            let to_min = ((baseline - min) / step).ceil();
            if n < to_min {
                baseline - n * step
            } else if n == to_min {
                min
            } else {
                0.0
            }
        }
        Ordering::Less => 0.0,
        Ordering::Greater if baseline < min => (min + (n - 1.0) * step).min(MAX_BRIGHTNESS),
        Ordering::Greater => (baseline + n * step).min(MAX_BRIGHTNESS),
    }
}

#[derive(Debug, Default)]
struct DimmerState {
    baseline: Option<Parameters>,
    step_count: i32,
}

/// Node whose output can be stepped up and down by pulses.
///
/// Passes its input through until a pulse overrides it; the next input
/// takes over again and resets the step counter.
pub struct DimmerNode {
    core: NodeCore<Transition>,
    device: DeviceId,
    settings: DimSettings,
    state: Mutex<DimmerState>,
}

impl DimmerNode {
    pub fn new(ctx: &NodeContext) -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::pass_through(format!("Dimmer[{}]", ctx.device)),
            device: ctx.device.clone(),
            settings: ctx.config.dim.clone(),
            state: Mutex::new(DimmerState::default()),
        })
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn step_count(&self) -> i32 {
        lock(&self.state).step_count
    }

    /// Forget the baseline; the next pulse captures a new one.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.baseline = None;
        state.step_count = 0;
    }

    /// Reset whenever `events` fires, e.g. a delegate's node-changed stream.
    pub fn bind_reset(self: &Arc<Self>, events: &Subject<()>) {
        let weak = Arc::downgrade(self);
        let subscription = events.subscribe(move |_| {
            if let Some(node) = weak.upgrade() {
                node.reset();
            }
        });
        self.core.scope().add(subscription);
    }

    /// Step one pulse in `direction`. Returns the new parameters, or `None`
    /// if the brightness is already at the limit.
    pub fn step(&self, direction: DimDirection) -> Option<Parameters> {
        let parameters = {
            let mut state = lock(&self.state);
            let baseline = match &state.baseline {
                Some(b) => b.clone(),
                None => {
                    let captured = self
                        .core
                        .output()
                        .map(|t| t.parameters)
                        .unwrap_or_else(Parameters::off);
                    state.baseline = Some(captured.clone());
                    captured
                }
            };

            let b0 = baseline.brightness_or_zero();
            let next_count = match direction {
                DimDirection::Dim => state.step_count.saturating_sub(1),
                DimDirection::Brighten => state.step_count.saturating_add(1),
            };
            let current = stepped_brightness(&self.settings, b0, state.step_count);
            let next = stepped_brightness(&self.settings, b0, next_count);
            if next == current {
                return None;
            }
            state.step_count = next_count;

            if next <= 0.0 {
                Parameters::off()
            } else {
                let mut p = baseline;
                p.brightness = Some(next);
                p
            }
        };

        tracing::debug!("{} {} -> {}", self.core.name(), direction, parameters);
        self.change_output_and_pass_through_on_next_input(Some(Transition::instant(parameters.clone())));
        Some(parameters)
    }
}

impl PipelineNode<Transition> for DimmerNode {
    fn core(&self) -> &NodeCore<Transition> {
        &self.core
    }

    fn set_input(&self, value: Option<Transition>) {
        self.reset();
        if self.core.accept_input(value.clone()) {
            self.on_input_received(value);
        }
    }
}

/// Several dimmer nodes dimmed as one group.
pub struct DimmerGroup {
    coordinator: DimCoordinator,
    nodes: Vec<Arc<DimmerNode>>,
}

impl DimmerGroup {
    /// `dim_order` must name each node's device exactly once.
    pub fn new(nodes: Vec<Arc<DimmerNode>>, dim_order: &[DeviceId], settings: DimSettings) -> Result<Self> {
        let members: Vec<DeviceId> = nodes.iter().map(|n| n.device().clone()).collect();
        let coordinator = DimCoordinator::new(&members, dim_order, settings)?;

        let mut ordered = Vec::with_capacity(nodes.len());
        for id in coordinator.order() {
            let node = nodes
                .iter()
                .find(|n| n.device() == id)
                .cloned()
                .ok_or_else(|| LightError::Config(format!("no dimmer node for '{}'", id)))?;
            ordered.push(node);
        }
        Ok(Self {
            coordinator,
            nodes: ordered,
        })
    }

    pub fn nodes(&self) -> &[Arc<DimmerNode>] {
        &self.nodes
    }

    /// Snapshot of the nodes' current outputs, in dim order.
    pub fn context(&self) -> DimmingContext {
        DimmingContext::new(
            self.nodes
                .iter()
                .map(|n| {
                    let parameters = n.output().map(|t| t.parameters).unwrap_or_else(Parameters::off);
                    (n.device().clone(), parameters)
                })
                .collect(),
        )
    }

    /// Run one pulse and return the new parameters of every node that moved.
    ///
    /// The coordinator only decides which nodes act. The value each acting
    /// node takes comes from its own step counter
    /// ([`stepped_brightness`]), not from the coordinator's [`DimAction`].
    /// The two agree for runs in one direction; after a change of direction
    /// the counter returns towards its baseline instead.
    ///
    /// [`DimAction`]: crate::dim::DimAction
    pub fn pulse(&self, direction: DimDirection) -> Vec<(DeviceId, Parameters)> {
        let ctx = self.context();
        let acting: Vec<&Arc<DimmerNode>> = self
            .nodes
            .iter()
            .filter(|n| self.coordinator.step(direction, &ctx, n.device()).is_some())
            .collect();

        acting
            .into_iter()
            .filter_map(|n| n.step(direction).map(|p| (n.device().clone(), p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::scheduler::VirtualScheduler;
    use proptest::prelude::*;

    fn settings(min: f64, step: f64) -> DimSettings {
        DimSettings::new(min, step)
    }

    fn dimmer(device: &str, min: f64, step: f64) -> Arc<DimmerNode> {
        let mut config = EngineConfig::default();
        config.dim = settings(min, step);
        let ctx = NodeContext::new(device, Arc::new(VirtualScheduler::new()), config);
        DimmerNode::new(&ctx)
    }

    fn brightness(node: &DimmerNode) -> f64 {
        node.output().map(|t| t.parameters.brightness_or_zero()).unwrap_or(0.0)
    }

    #[test]
    fn test_stepped_brightness_visits_min_once() {
        let s = settings(50.0, 30.0);
        let dims: Vec<f64> = (0..=4).map(|k| stepped_brightness(&s, 100.0, -k)).collect();
        assert_eq!(dims, vec![100.0, 70.0, 50.0, 0.0, 0.0]);

        let ups: Vec<f64> = (0..=3).map(|k| stepped_brightness(&s, 0.0, k)).collect();
        assert_eq!(ups, vec![0.0, 50.0, 80.0, 110.0]);

        assert_eq!(stepped_brightness(&s, 30.0, -1), 0.0);
        assert_eq!(stepped_brightness(&s, 240.0, 1), 255.0);
    }

    #[test]
    fn test_pulses_step_the_output() {
        let node = dimmer("a", 50.0, 30.0);
        node.set_input(Some(Transition::instant(Parameters::with_brightness(100.0).color_temp(300))));

        assert_eq!(node.step(DimDirection::Dim).unwrap().brightness, Some(70.0));
        assert_eq!(node.step(DimDirection::Dim).unwrap().brightness, Some(50.0));
        assert_eq!(node.step(DimDirection::Dim), Some(Parameters::off()));
        assert_eq!(node.step(DimDirection::Dim), None);
        assert_eq!(node.step_count(), -3);

        assert_eq!(node.step(DimDirection::Brighten).unwrap(), Parameters::with_brightness(50.0).color_temp(300));
    }

    #[test]
    fn test_input_resets_and_takes_over() {
        let node = dimmer("a", 50.0, 30.0);
        node.set_input(Some(Transition::on()));
        node.step(DimDirection::Dim);
        assert_eq!(brightness(&node), 225.0);

        node.set_input(Some(Transition::instant(Parameters::with_brightness(90.0))));
        assert_eq!(brightness(&node), 90.0);
        assert_eq!(node.step_count(), 0);
        node.step(DimDirection::Dim);
        assert_eq!(brightness(&node), 60.0);
    }

    #[test]
    fn test_bound_reset() {
        let node = dimmer("a", 50.0, 30.0);
        let changed = Subject::new();
        node.bind_reset(&changed);
        node.set_input(Some(Transition::on()));
        node.step(DimDirection::Dim);
        assert_eq!(node.step_count(), -1);
        changed.emit(&());
        assert_eq!(node.step_count(), 0);
        // New baseline is the dimmed output.
        node.step(DimDirection::Dim);
        assert_eq!(brightness(&node), 195.0);
    }

    #[test]
    fn test_group_dims_in_order() {
        let a = dimmer("a", 50.0, 25.0);
        let b = dimmer("b", 50.0, 25.0);
        a.set_input(Some(Transition::instant(Parameters::with_brightness(75.0))));
        b.set_input(Some(Transition::instant(Parameters::with_brightness(50.0))));
        let order: Vec<DeviceId> = vec!["b".into(), "a".into()];
        let group = DimmerGroup::new(vec![a.clone(), b.clone()], &order, settings(50.0, 25.0)).unwrap();

        assert_eq!(group.pulse(DimDirection::Dim), vec![(DeviceId::from("a"), Parameters::with_brightness(50.0))]);
        assert_eq!(group.pulse(DimDirection::Dim), vec![(DeviceId::from("b"), Parameters::off())]);
        assert_eq!(group.pulse(DimDirection::Dim), vec![(DeviceId::from("a"), Parameters::off())]);
        assert!(group.pulse(DimDirection::Dim).is_empty());
    }

    #[test]
    fn test_group_rejects_unknown_order() {
        let a = dimmer("a", 50.0, 25.0);
        let order: Vec<DeviceId> = vec!["x".into()];
        assert!(DimmerGroup::new(vec![a], &order, settings(50.0, 25.0)).is_err());
    }

    proptest! {
        /// For a single light, stepping with the counter and arbitrating from
        /// a fresh snapshot each pulse agree for any run of same-direction
        /// pulses.
        #[test]
        fn test_stateful_matches_static_coordinator(
            start in 0u8..=255,
            min in 1u8..=120,
            step in 1u8..=80,
            dim in any::<bool>(),
            pulses in 1usize..30,
        ) {
            let (min, step) = (f64::from(min), f64::from(step));
            let direction = if dim { DimDirection::Dim } else { DimDirection::Brighten };
            let id = DeviceId::from("a");
            let coordinator = DimCoordinator::new(
                std::slice::from_ref(&id),
                std::slice::from_ref(&id),
                settings(min, step),
            ).unwrap();

            let node = dimmer("a", min, step);
            node.set_input(Some(Transition::instant(Parameters::with_brightness(f64::from(start)))));
            let mut expected = f64::from(start);

            for _ in 0..pulses {
                let ctx = DimmingContext::new(vec![(id.clone(), Parameters::with_brightness(expected))]);
                if let Some(action) = coordinator.step(direction, &ctx, &id) {
                    expected = action.brightness();
                }
                node.step(direction);
                prop_assert_eq!(brightness(&node), expected);
            }

        }
    }
}
