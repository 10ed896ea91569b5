//! Node-based behaviour pipelines.
//!
//! A light's target state is computed by a chain of small stateful nodes.
//! Each node holds its current input and output, can pass its input
//! straight through, and publishes every output on an output-change stream.
//! A [`Pipeline`] wires the chain together and hands the final output to a
//! handler, usually a [`LightBinding`] that applies it to a device.
//!
//! # Architecture
//!
//! ```text
//! default ──► [DynamicDelegate] ──► [Transition] ──► [Timeout] ──► handler ──► Device
//!                   ▲
//!            activation events (Sequence / triggers)
//! ```
//!
//! # Design
//!
//! - **Synchronous push**: writing an input recomputes everything downstream
//!   before returning, up to a scheduler boundary.
//! - **Explicit context**: node factories receive a [`NodeContext`] argument
//!   naming the device, scheduler and settings.
//! - **Ownership tree**: each node owns a [`DisposeScope`]; teardown runs
//!   newest-first and collects failures instead of stopping.

pub mod binding;
pub mod executor;
pub mod id;
pub mod node;
pub mod nodes;
pub mod observable;
pub mod scope;
pub mod sequence;

pub use binding::LightBinding;
pub use executor::{DisposeReport, OutputHandler, OutputMode, Pipeline};
pub use id::NodeId;
pub use node::{factory, NodeContext, NodeCore, NodeFactory, NodeValue, PipelineNode, SharedNode};
pub use nodes::{
    Activation, DimmerGroup, DimmerNode, DynamicDelegateNode, MapNode, PassThroughNode, StaticNode, TimeoutNode,
    TransitionNode,
};
pub use observable::{Debouncer, Subject, Subscription};
pub use scope::{DisposeScope, Disposable, OnDispose};
pub use sequence::{Sequence, SequenceBuilder, SequenceTrigger};
