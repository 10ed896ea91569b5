//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use lightflow::config::EngineConfig;
use lightflow::pipeline::{NodeContext, Pipeline, Subscription};
use lightflow::scheduler::VirtualScheduler;
use lightflow::types::Transition;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Virtual clock plus a node context for `device` on it.
pub fn virtual_context(device: &str, config: EngineConfig) -> (Arc<VirtualScheduler>, NodeContext) {
    let scheduler = Arc::new(VirtualScheduler::new());
    let ctx = NodeContext::new(device, scheduler.clone(), config);
    (scheduler, ctx)
}

/// Collect every output a pipeline publishes.
pub fn record_outputs(pipeline: &Pipeline<Transition>) -> (Arc<Mutex<Vec<Option<Transition>>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let sub = pipeline
        .output_changed()
        .subscribe(move |v: &Option<Transition>| s.lock().unwrap().push(v.clone()));
    (seen, sub)
}

pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}
