//! DynamicDelegateNode: hot-swappable behaviour.
//!
//! The delegate owns at most one active child node. Activation events
//! replace it: the previous child is fully disposed before the next one is
//! built, so two children are never alive at once. While a child is active
//! the delegate forwards input to it and republishes its output; while idle
//! the delegate passes its input straight through.
//!
//! Swaps and input forwarding are serialised by one lock, so a swap arriving
//! from a timer thread cannot interleave with a device-state update.

use crate::error::Result;
use crate::pipeline::node::{NodeContext, NodeCore, NodeFactory, NodeValue, PipelineNode, SharedNode};
use crate::pipeline::observable::{Subject, Subscription};
use crate::sync::lock;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// What a delegate should run next.
pub enum Activation<T> {
    /// Build a node with this factory and make it the active child
    Activate(NodeFactory<T>),
    /// Drop the active child and pass input through
    Deactivate,
}

impl<T> Clone for Activation<T> {
    fn clone(&self) -> Self {
        match self {
            Activation::Activate(factory) => Activation::Activate(factory.clone()),
            Activation::Deactivate => Activation::Deactivate,
        }
    }
}

impl<T> fmt::Debug for Activation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Activate(_) => write!(f, "Activate(..)"),
            Activation::Deactivate => write!(f, "Deactivate"),
        }
    }
}

struct ActiveChild<T: NodeValue> {
    node: SharedNode<T>,
    _subscription: Subscription,
}

/// Node that delegates to a swappable child.
pub struct DynamicDelegateNode<T: NodeValue> {
    core: NodeCore<T>,
    context: NodeContext,
    swap_lock: Mutex<()>,
    active: Mutex<Option<ActiveChild<T>>>,
    node_changed: Subject<()>,
    weak_self: Weak<DynamicDelegateNode<T>>,
}

impl<T: NodeValue> DynamicDelegateNode<T> {
    /// An idle delegate; factories are invoked with `context`.
    pub fn new(context: NodeContext) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            core: NodeCore::pass_through("DynamicDelegate"),
            context,
            swap_lock: Mutex::new(()),
            active: Mutex::new(None),
            node_changed: Subject::new(),
            weak_self: weak.clone(),
        })
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    /// Fires after every swap or deactivation.
    pub fn node_changed(&self) -> &Subject<()> {
        &self.node_changed
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn active_node(&self) -> Option<SharedNode<T>> {
        lock(&self.active).as_ref().map(|a| a.node.clone())
    }

    /// Apply an activation event.
    ///
    /// A failing factory leaves the delegate idle (passing through) and
    /// returns the factory's error.
    pub fn activate(&self, activation: Activation<T>) -> Result<()> {
        let result = match activation {
            Activation::Activate(factory) => self.swap_in(&factory),
            Activation::Deactivate => {
                self.deactivate();
                Ok(())
            }
        };
        self.node_changed.emit(&());
        result
    }

    /// Drive this delegate from a stream of activation events. The
    /// subscription lives as long as the delegate.
    pub fn bind(&self, events: &Subject<Activation<T>>) {
        let weak = self.weak_self.clone();
        let subscription = events.subscribe(move |activation: &Activation<T>| {
            if let Some(delegate) = weak.upgrade() {
                if let Err(e) = delegate.activate(activation.clone()) {
                    tracing::error!("{} ({}) activation failed: {}", delegate.core.name(), delegate.core.id(), e);
                }
            }
        });
        self.core.scope().add(subscription);
    }

    fn release_active(&self) {
        let previous = lock(&self.active).take();
        if let Some(ActiveChild { node, _subscription }) = previous {
            drop(_subscription);
            if let Err(e) = node.dispose() {
                tracing::warn!("{} ({}) failed to dispose {}: {}", self.core.name(), self.core.id(), node.name(), e);
            }
        }
    }

    fn deactivate(&self) {
        {
            let _swap = lock(&self.swap_lock);
            self.release_active();
        }
        tracing::debug!("{} ({}) idle", self.core.name(), self.core.id());
        self.core.set_pass_through(true);
    }

    fn swap_in(&self, factory: &NodeFactory<T>) -> Result<()> {
        let current = {
            let _swap = lock(&self.swap_lock);
            self.release_active();

            let node = match factory(&self.context) {
                Ok(node) => node,
                Err(e) => {
                    drop(_swap);
                    self.core.set_pass_through(true);
                    return Err(e.with_context(format!("activating a node in {}", self.core.name())));
                }
            };

            let weak = self.weak_self.clone();
            let subscription = node.subscribe_output(Box::new(move |value: &Option<T>| {
                if let Some(delegate) = weak.upgrade() {
                    delegate.forward_child_output(value.clone());
                }
            }));
            node.set_input(self.core.input());
            self.core.set_pass_through_flag(false);
            tracing::debug!("{} ({}) activated {} ({})", self.core.name(), self.core.id(), node.name(), node.id());

            let current = node.output();
            *lock(&self.active) = Some(ActiveChild {
                node,
                _subscription: subscription,
            });
            current
        };
        self.forward_child_output(current);
        Ok(())
    }

    fn forward_child_output(&self, value: Option<T>) {
        if self.core.output() != value {
            self.core.emit_output(value);
        }
    }
}

impl<T: NodeValue> PipelineNode<T> for DynamicDelegateNode<T> {
    fn core(&self) -> &NodeCore<T> {
        &self.core
    }

    fn set_input(&self, value: Option<T>) {
        let _swap = lock(&self.swap_lock);
        match self.active_node() {
            Some(child) => {
                self.core.record_input(value.clone());
                child.set_input(value);
            }
            None => {
                if self.core.accept_input(value.clone()) {
                    self.on_input_received(value);
                }
            }
        }
    }

    fn dispose(&self) -> Result<()> {
        {
            let _swap = lock(&self.swap_lock);
            self.release_active();
        }
        self.core.dispose()
    }
}
