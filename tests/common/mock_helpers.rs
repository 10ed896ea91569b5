//! Node doubles for integration tests

use lightflow::error::{LightError, Result};
use lightflow::pipeline::{NodeCore, OnDispose, PipelineNode};
use lightflow::types::Transition;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pass-through node that counts inputs and fails to dispose on request.
pub struct CountingNode {
    core: NodeCore<Transition>,
    inputs: AtomicUsize,
}

impl CountingNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::pass_through("Counting"),
            inputs: AtomicUsize::new(0),
        })
    }

    /// A counter whose teardown reports an error.
    pub fn failing() -> Arc<Self> {
        let node = Self::new();
        node.core
            .scope()
            .add(OnDispose(|| -> Result<()> { Err(LightError::Channel("device went away".to_string())) }));
        node
    }

    pub fn input_count(&self) -> usize {
        self.inputs.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }
}

impl PipelineNode<Transition> for CountingNode {
    fn core(&self) -> &NodeCore<Transition> {
        &self.core
    }

    fn set_input(&self, value: Option<Transition>) {
        self.inputs.fetch_add(1, Ordering::SeqCst);
        if self.core.accept_input(value.clone()) {
            self.on_input_received(value);
        }
    }
}
