//! Pipeline: an ordered chain of nodes.
//!
//! For nodes `[n0..nk]` the pipeline keeps `n(i+1).input` driven from
//! `ni.output` and publishes `nk.output` (or the default value while the
//! chain is empty) as its own output.
//!
//! Propagation is synchronous: writing the first node's input recomputes
//! the whole chain before returning, unless a node defers work through the
//! scheduler.

use crate::error::LightError;
use crate::pipeline::node::{NodeValue, SharedNode};
use crate::pipeline::observable::{Subject, Subscription};
use crate::sync::lock;
use std::sync::{Arc, Mutex, Weak};

/// When the output handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Only when the output differs from the last handled value
    #[default]
    Distinct,
    /// On every published output
    EveryOutput,
}

/// Callback receiving the pipeline output.
pub type OutputHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct HandlerSlot<T> {
    handler: OutputHandler<T>,
    mode: OutputMode,
    last: Option<T>,
}

struct PipelineInner<T: NodeValue> {
    name: String,
    nodes: Mutex<Vec<SharedNode<T>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    default: Mutex<Option<T>>,
    output: Mutex<Option<T>>,
    output_changed: Subject<Option<T>>,
    handler: Mutex<Option<HandlerSlot<T>>>,
}

impl<T: NodeValue> PipelineInner<T> {
    /// Route node `index`'s output to the next node, or publish it.
    fn on_node_output(&self, index: usize, value: Option<T>) {
        let next = lock(&self.nodes).get(index + 1).cloned();
        match next {
            Some(next) => next.set_input(value),
            None => self.publish(value),
        }
    }

    fn publish(&self, value: Option<T>) {
        *lock(&self.output) = value.clone();
        self.output_changed.emit(&value);

        let Some(value) = value else {
            return;
        };
        let handler = {
            let mut slot = lock(&self.handler);
            match slot.as_mut() {
                Some(slot) if slot.mode == OutputMode::Distinct && slot.last.as_ref() == Some(&value) => None,
                Some(slot) => {
                    slot.last = Some(value.clone());
                    Some(slot.handler.clone())
                }
                None => None,
            }
        };
        if let Some(handler) = handler {
            tracing::trace!("Pipeline '{}' output: {:?}", self.name, value);
            handler(&value);
        }
    }
}

/// Result of tearing a pipeline down.
#[derive(Debug, Default)]
pub struct DisposeReport {
    /// Nodes that were released
    pub disposed: usize,
    /// Failures, one per node that failed
    pub failures: Vec<LightError>,
}

impl DisposeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered chain of nodes with a default value and an output handler.
pub struct Pipeline<T: NodeValue> {
    inner: Arc<PipelineInner<T>>,
}

impl<T: NodeValue> Pipeline<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                name: name.into(),
                nodes: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                default: Mutex::new(None),
                output: Mutex::new(None),
                output_changed: Subject::new(),
                handler: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Set the value fed to the first node (or published while empty).
    pub fn set_default(&self, value: Option<T>) {
        *lock(&self.inner.default) = value.clone();
        let first = lock(&self.inner.nodes).first().cloned();
        match first {
            Some(first) => first.set_input(value),
            None => self.inner.publish(value),
        }
    }

    pub fn default_value(&self) -> Option<T> {
        lock(&self.inner.default).clone()
    }

    /// Append `node` to the chain and return its position.
    ///
    /// The node receives the previous node's output (or the default) as its
    /// initial input, and its current output is published right away.
    pub fn register_node(&self, node: SharedNode<T>) -> usize {
        let (index, upstream) = {
            let mut nodes = lock(&self.inner.nodes);
            let upstream = match nodes.last() {
                Some(previous) => previous.output(),
                None => lock(&self.inner.default).clone(),
            };
            nodes.push(node.clone());
            (nodes.len() - 1, upstream)
        };
        tracing::debug!("Pipeline '{}': registered {} at {}", self.inner.name, node.name(), index);

        node.set_input(upstream);

        let weak: Weak<PipelineInner<T>> = Arc::downgrade(&self.inner);
        let subscription = node.subscribe_output(Box::new(move |value: &Option<T>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_node_output(index, value.clone());
            }
        }));
        lock(&self.inner.subscriptions).push(subscription);

        self.inner.on_node_output(index, node.output());
        index
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, index: usize) -> Option<SharedNode<T>> {
        lock(&self.inner.nodes).get(index).cloned()
    }

    pub fn output(&self) -> Option<T> {
        lock(&self.inner.output).clone()
    }

    /// Every published output, including `None`.
    pub fn output_changed(&self) -> &Subject<Option<T>> {
        &self.inner.output_changed
    }

    /// Install the output handler, replacing any previous one. A present
    /// output is handed to it immediately.
    pub fn set_output_handler<F>(&self, handler: F, mode: OutputMode)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        *lock(&self.inner.handler) = Some(HandlerSlot {
            handler: Arc::new(handler),
            mode,
            last: None,
        });
        let current = self.output();
        if current.is_some() {
            self.inner.publish(current);
        }
    }

    pub fn clear_output_handler(&self) {
        lock(&self.inner.handler).take();
    }

    /// Unwire and dispose every node. A failing node is reported and the
    /// remaining nodes are still released.
    pub fn dispose(&self) -> DisposeReport {
        lock(&self.inner.subscriptions).clear();
        self.clear_output_handler();
        let nodes: Vec<SharedNode<T>> = std::mem::take(&mut *lock(&self.inner.nodes));

        let mut report = DisposeReport::default();
        for node in nodes {
            match node.dispose() {
                Ok(()) => report.disposed += 1,
                Err(e) => {
                    tracing::warn!("Pipeline '{}': failed to dispose {}: {}", self.inner.name, node.name(), e);
                    report.failures.push(e);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::{NodeCore, PipelineNode};
    use crate::pipeline::scope::OnDispose;
    use crate::error::Result;

    /// Adds a constant to its input.
    struct AddNode {
        core: NodeCore<i32>,
        amount: i32,
    }

    impl AddNode {
        fn shared(amount: i32) -> Arc<Self> {
            Arc::new(Self {
                core: NodeCore::new("add"),
                amount,
            })
        }
    }

    impl PipelineNode<i32> for AddNode {
        fn core(&self) -> &NodeCore<i32> {
            &self.core
        }

        fn on_input_received(&self, input: Option<i32>) {
            self.core.emit_output(input.map(|v| v + self.amount));
        }
    }

    fn handled(pipeline: &Pipeline<i32>, mode: OutputMode) -> Arc<Mutex<Vec<i32>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        pipeline.set_output_handler(move |v| s.lock().unwrap().push(*v), mode);
        seen
    }

    #[test]
    fn test_empty_pipeline_publishes_default() {
        let pipeline = Pipeline::<i32>::new("empty");
        pipeline.set_default(Some(4));
        assert_eq!(pipeline.output(), Some(4));
    }

    #[test]
    fn test_chain_is_driven_from_previous_output() {
        let pipeline = Pipeline::new("chain");
        pipeline.set_default(Some(1));
        let a = AddNode::shared(10);
        let b = AddNode::shared(100);
        pipeline.register_node(a.clone());
        assert_eq!(pipeline.output(), Some(11));
        pipeline.register_node(b.clone());
        assert_eq!(b.input(), Some(11));
        assert_eq!(pipeline.output(), Some(111));

        pipeline.set_default(Some(2));
        assert_eq!(a.output(), Some(12));
        assert_eq!(b.input(), a.output());
        assert_eq!(pipeline.output(), b.output());
        assert_eq!(pipeline.output(), Some(112));
    }

    #[test]
    fn test_distinct_handler_skips_repeats() {
        let pipeline = Pipeline::new("distinct");
        let seen = handled(&pipeline, OutputMode::Distinct);
        pipeline.set_default(Some(1));
        pipeline.set_default(Some(1));
        pipeline.set_default(Some(2));
        pipeline.set_default(None);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_every_output_handler_sees_repeats() {
        let pipeline = Pipeline::new("every");
        let seen = handled(&pipeline, OutputMode::EveryOutput);
        pipeline.set_default(Some(1));
        pipeline.set_default(Some(1));
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_handler_receives_current_output_on_install() {
        let pipeline = Pipeline::new("late");
        pipeline.set_default(Some(7));
        let seen = handled(&pipeline, OutputMode::Distinct);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_dispose_contains_failures() {
        let pipeline = Pipeline::new("dispose");
        let failing = AddNode::shared(1);
        failing
            .core()
            .scope()
            .add(OnDispose(|| -> Result<()> { Err(LightError::Factory("stuck".to_string())) }));
        let healthy = AddNode::shared(2);
        pipeline.register_node(failing.clone());
        pipeline.register_node(healthy.clone());

        let report = pipeline.dispose();
        assert_eq!(report.disposed, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_clean());
        assert!(healthy.core().is_disposed());
        assert!(failing.core().is_disposed());
        assert!(pipeline.is_empty());
    }
}
