//! Built-in pipeline node implementations.

pub mod basic;
pub mod delegate;
pub mod dimmer;
pub mod timeout;
pub mod transition;

pub use basic::{MapNode, PassThroughNode, StaticNode};
pub use delegate::{Activation, DynamicDelegateNode};
pub use dimmer::{stepped_brightness, DimmerGroup, DimmerNode};
pub use timeout::TimeoutNode;
pub use transition::TransitionNode;
