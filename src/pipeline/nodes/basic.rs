//! Small general-purpose nodes.
//!
//! - [`PassThroughNode`] - output always mirrors input
//! - [`StaticNode`] - holds one fixed output and ignores input
//! - [`MapNode`] - output is a function of input

use crate::pipeline::node::{NodeCore, NodeValue, PipelineNode};

/// Output mirrors input.
pub struct PassThroughNode<T: NodeValue> {
    core: NodeCore<T>,
}

impl<T: NodeValue> PassThroughNode<T> {
    pub fn new() -> Self {
        Self {
            core: NodeCore::pass_through("PassThrough"),
        }
    }
}

impl<T: NodeValue> Default for PassThroughNode<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NodeValue> PipelineNode<T> for PassThroughNode<T> {
    fn core(&self) -> &NodeCore<T> {
        &self.core
    }
}

/// Holds a fixed output regardless of input.
pub struct StaticNode<T: NodeValue> {
    core: NodeCore<T>,
}

impl<T: NodeValue> StaticNode<T> {
    pub fn new(value: T) -> Self {
        let core = NodeCore::new("Static");
        core.emit_output(Some(value));
        Self { core }
    }
}

impl<T: NodeValue> PipelineNode<T> for StaticNode<T> {
    fn core(&self) -> &NodeCore<T> {
        &self.core
    }
}

/// Output is `f(input)`; an absent input gives an absent output.
pub struct MapNode<T: NodeValue> {
    core: NodeCore<T>,
    f: Box<dyn Fn(&T) -> T + Send + Sync>,
}

impl<T: NodeValue> MapNode<T> {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        Self {
            core: NodeCore::new(name),
            f: Box::new(f),
        }
    }
}

impl<T: NodeValue> PipelineNode<T> for MapNode<T> {
    fn core(&self) -> &NodeCore<T> {
        &self.core
    }

    fn on_input_received(&self, input: Option<T>) {
        self.core.emit_output(input.as_ref().map(|v| (self.f)(v)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_node() {
        let node = PassThroughNode::<u8>::new();
        node.set_input(Some(3));
        assert_eq!(node.output(), Some(3));
        node.set_input(None);
        assert_eq!(node.output(), None);
    }

    #[test]
    fn test_static_node_ignores_input() {
        let node = StaticNode::new(9u8);
        node.set_input(Some(1));
        assert_eq!(node.output(), Some(9));
        assert_eq!(node.input(), Some(1));
    }

    #[test]
    fn test_map_node() {
        let node = MapNode::new("double", |v: &u32| v * 2);
        node.set_input(Some(21));
        assert_eq!(node.output(), Some(42));
        node.set_input(None);
        assert_eq!(node.output(), None);
    }

    #[test]
    fn test_map_node_override_then_pass_through() {
        let node = MapNode::new("double", |v: &u32| v * 2);
        node.set_input(Some(1));
        node.change_output_and_pass_through_on_next_input(Some(100));
        assert_eq!(node.output(), Some(100));
        node.set_input(Some(5));
        assert_eq!(node.output(), Some(5));
    }
}
