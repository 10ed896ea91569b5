//! Cycle and toggle sequences driving a [`DynamicDelegateNode`].
//!
//! A [`Sequence`] is an ordered list of activations, each optionally paired
//! with a predicate recognising "this entry is what is showing now". On a
//! trigger the sequence finds the entry matching the delegate's current
//! output (or, when nothing matches, the entry it handed out last) and
//! activates the one after it, wrapping around.

use crate::error::{LightError, Result};
use crate::pipeline::node::{NodeFactory, NodeValue, PipelineNode};
use crate::pipeline::nodes::delegate::{Activation, DynamicDelegateNode};
use crate::pipeline::observable::{Subject, Subscription};
use crate::sync::lock;
use std::sync::{Arc, Mutex};

type Predicate<T> = Arc<dyn Fn(Option<&T>) -> bool + Send + Sync>;

struct SequenceEntry<T> {
    activation: Activation<T>,
    predicate: Option<Predicate<T>>,
}

/// Ordered activations stepped through by a trigger.
pub struct Sequence<T> {
    entries: Vec<SequenceEntry<T>>,
    cursor: Mutex<Option<usize>>,
}

impl<T: NodeValue> Sequence<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The activation following the one currently showing.
    pub fn next_activation(&self, current_output: Option<&T>) -> Activation<T> {
        let matched = self
            .entries
            .iter()
            .position(|e| e.predicate.as_ref().is_some_and(|p| p(current_output)));

        let mut cursor = lock(&self.cursor);
        let next = match (matched, *cursor) {
            (Some(i), _) | (None, Some(i)) => (i + 1) % self.entries.len(),
            (None, None) => 0,
        };
        *cursor = Some(next);
        self.entries[next].activation.clone()
    }
}

/// Builds a [`Sequence`].
pub struct SequenceBuilder<T> {
    entries: Vec<SequenceEntry<T>>,
}

impl<T: NodeValue> SequenceBuilder<T> {
    /// Start an empty cycle.
    pub fn cycle() -> Self {
        Self { entries: Vec::new() }
    }

    /// Alternate between `factory` and idle, starting with `factory`.
    pub fn toggle(factory: NodeFactory<T>) -> Self {
        Self::cycle().then(factory).then_off()
    }

    /// Append a step with no recognising predicate.
    pub fn then(mut self, factory: NodeFactory<T>) -> Self {
        self.entries.push(SequenceEntry {
            activation: Activation::Activate(factory),
            predicate: None,
        });
        self
    }

    /// Append a step recognised by `predicate` on the current output.
    pub fn then_when<P>(mut self, factory: NodeFactory<T>, predicate: P) -> Self
    where
        P: Fn(Option<&T>) -> bool + Send + Sync + 'static,
    {
        self.entries.push(SequenceEntry {
            activation: Activation::Activate(factory),
            predicate: Some(Arc::new(predicate)),
        });
        self
    }

    /// Append an idle step.
    pub fn then_off(mut self) -> Self {
        self.entries.push(SequenceEntry {
            activation: Activation::Deactivate,
            predicate: None,
        });
        self
    }

    pub fn build(self) -> Result<Sequence<T>> {
        if self.entries.is_empty() {
            return Err(LightError::Config("a sequence needs at least one step".to_string()));
        }
        Ok(Sequence {
            entries: self.entries,
            cursor: Mutex::new(None),
        })
    }
}

/// Connects a trigger stream, a sequence and a delegate.
pub struct SequenceTrigger;

impl SequenceTrigger {
    /// Advance `sequence` on `delegate` every time `trigger` fires.
    pub fn bind<T: NodeValue>(
        trigger: &Subject<()>,
        sequence: Arc<Sequence<T>>,
        delegate: &Arc<DynamicDelegateNode<T>>,
    ) -> Subscription {
        let weak = Arc::downgrade(delegate);
        trigger.subscribe(move |_| {
            let Some(delegate) = weak.upgrade() else {
                return;
            };
            let activation = sequence.next_activation(delegate.output().as_ref());
            if let Err(e) = delegate.activate(activation) {
                tracing::error!("Sequence step on {} failed: {}", delegate.name(), e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::node::{factory, NodeContext, SharedNode};
    use crate::pipeline::nodes::basic::StaticNode;
    use crate::scheduler::VirtualScheduler;

    fn scene(value: u32) -> NodeFactory<u32> {
        factory(move |_ctx| Ok(Arc::new(StaticNode::new(value)) as SharedNode<u32>))
    }

    fn delegate() -> Arc<DynamicDelegateNode<u32>> {
        let ctx = NodeContext::new("light", Arc::new(VirtualScheduler::new()), EngineConfig::default());
        DynamicDelegateNode::new(ctx)
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        let err = SequenceBuilder::<u32>::cycle().build().err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_cycle_wraps_around() {
        let sequence = Arc::new(SequenceBuilder::cycle().then(scene(1)).then(scene(2)).then(scene(3)).build().unwrap());
        let node = delegate();
        let trigger = Subject::new();
        let _sub = SequenceTrigger::bind(&trigger, sequence, &node);

        let mut seen = Vec::new();
        for _ in 0..4 {
            trigger.emit(&());
            seen.push(node.output());
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(3), Some(1)]);
    }

    #[test]
    fn test_toggle_alternates_with_idle() {
        let sequence = Arc::new(SequenceBuilder::toggle(scene(100)).build().unwrap());
        let node = delegate();
        node.set_input(Some(5));
        let trigger = Subject::new();
        let _sub = SequenceTrigger::bind(&trigger, sequence, &node);

        trigger.emit(&());
        assert_eq!(node.output(), Some(100));
        trigger.emit(&());
        assert_eq!(node.output(), Some(5));
        assert!(!node.is_active());
        trigger.emit(&());
        assert_eq!(node.output(), Some(100));
    }

    #[test]
    fn test_predicate_picks_up_from_current_output() {
        let sequence = SequenceBuilder::cycle()
            .then_when(scene(10), |v| v == Some(&10))
            .then_when(scene(20), |v| v == Some(&20))
            .then_when(scene(30), |v| v == Some(&30))
            .build()
            .unwrap();

        // Something else put the light at 20: the next step is 30.
        match sequence.next_activation(Some(&20)) {
            Activation::Activate(f) => {
                let ctx = NodeContext::new("light", Arc::new(VirtualScheduler::new()), EngineConfig::default());
                assert_eq!(f(&ctx).unwrap().output(), Some(30));
            }
            Activation::Deactivate => panic!("expected an activation"),
        }
    }
}
