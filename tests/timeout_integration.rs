//! Idle timeout in a bound pipeline.

mod common;

use common::builders::ConfigBuilder;
use common::{record_outputs, secs, virtual_context};
use lightflow::device::SimulatedLight;
use lightflow::pipeline::{LightBinding, Pipeline, Subject, TimeoutNode, TransitionNode};
use lightflow::scheduler::VirtualScheduler;
use lightflow::types::{Parameters, Transition};
use std::sync::Arc;
use std::time::Duration;

struct Rig {
    scheduler: Arc<VirtualScheduler>,
    pipeline: Arc<Pipeline<Transition>>,
    timeout: Arc<TimeoutNode>,
    light: Arc<SimulatedLight>,
    _binding: LightBinding,
}

fn rig() -> Rig {
    let config = ConfigBuilder::new().idle_timeout_secs(10).build();
    let (scheduler, ctx) = virtual_context("porch", config);
    let light = Arc::new(SimulatedLight::off("porch"));
    let pipeline = Arc::new(Pipeline::new("porch"));
    let timeout = TimeoutNode::new(&ctx, TransitionNode::new(&ctx), ctx.config.idle_timeout().unwrap());
    pipeline.register_node(timeout.clone());
    let binding = LightBinding::bind(pipeline.clone(), light.clone());
    Rig {
        scheduler,
        pipeline,
        timeout,
        light,
        _binding: binding,
    }
}

#[test]
fn test_light_turns_off_after_idle_window() {
    let rig = rig();
    rig.pipeline.set_default(Some(Transition::on()));
    assert_eq!(rig.light.brightness(), 255.0);

    rig.scheduler.advance_by(secs(9.9));
    assert_eq!(rig.light.brightness(), 255.0);

    rig.scheduler.advance_by(secs(0.1));
    assert!(rig.timeout.is_expired());
    assert_eq!(rig.light.last_transition(), Some(Transition::off()));
}

#[test]
fn test_next_input_after_expiry_is_shown() {
    let rig = rig();
    rig.pipeline.set_default(Some(Transition::on()));
    rig.scheduler.advance_by(secs(10.0));
    assert_eq!(rig.light.brightness(), 0.0);

    rig.pipeline.set_default(Some(Transition::instant(Parameters::with_brightness(80.0))));
    assert_eq!(rig.light.brightness(), 80.0);
    // Off is not forced again without a new window.
    rig.scheduler.advance_by(secs(60.0));
    assert_eq!(rig.light.brightness(), 80.0);
}

#[test]
fn test_refresh_events_keep_the_light_on() {
    let rig = rig();
    let motion = Subject::<()>::new();
    rig.timeout.bind_refresh(&motion);
    rig.pipeline.set_default(Some(Transition::on()));

    for _ in 0..5 {
        rig.scheduler.advance_by(secs(9.0));
        motion.emit(&());
    }
    assert_eq!(rig.light.brightness(), 255.0);
    assert_eq!(rig.scheduler.elapsed(), Duration::from_secs(45));

    rig.scheduler.advance_by(secs(10.0));
    assert_eq!(rig.light.brightness(), 0.0);
}

#[test]
fn test_refreshed_expiry_hands_next_input_to_child_only() {
    let rig = rig();
    rig.pipeline.set_default(Some(Transition::on()));
    rig.scheduler.advance_by(secs(10.0));
    rig.timeout.refresh();

    let (seen, _sub) = record_outputs(&rig.pipeline);
    rig.pipeline.set_default(Some(Transition::over(Parameters::with_brightness(80.0), secs(4.0))));

    // One input, one published frame: the transition node's catch-up frame.
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1, "emissions: {:?}", seen);
    assert_eq!(seen[0], rig.light.last_transition());
    assert!(!rig.timeout.is_expired());
}

#[test]
fn test_dispose_cancels_pending_expiry() {
    let rig = rig();
    rig.pipeline.set_default(Some(Transition::on()));
    let report = rig.pipeline.dispose();
    assert!(report.is_clean());
    rig.scheduler.advance_by(secs(30.0));
    assert_eq!(rig.light.brightness(), 255.0);
    assert!(!rig.timeout.is_expired());
}
