//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`NodeCore`**: the shared bookkeeping every node embeds: current
//!   input and output, the pass-through flags, the output-change stream and
//!   the dispose scope.
//! - **`PipelineNode` trait**: the surface the pipeline talks to. Its
//!   default methods drive the core; concrete nodes override
//!   `on_input_received` (and occasionally `set_input`, `set_output` or
//!   `set_pass_through`) to add behaviour.
//!
//! Pass-through rules:
//! - while pass-through is on, every input write becomes the output;
//! - arming "pass-through on next input" turns pass-through on at the next
//!   input write and then clears itself;
//! - an explicit output assignment clears both flags.

use crate::color::Interpolator;
use crate::config::EngineConfig;
use crate::device::DeviceId;
use crate::error::Result;
use crate::pipeline::id::NodeId;
use crate::pipeline::observable::{Subject, Subscription};
use crate::pipeline::scope::DisposeScope;
use crate::scheduler::SharedScheduler;
use crate::sync::lock;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Values that can flow through a pipeline.
pub trait NodeValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> NodeValue for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

#[derive(Debug)]
struct NodeState<T> {
    input: Option<T>,
    output: Option<T>,
    pass_through: bool,
    pass_through_next_input: bool,
    disposed: bool,
}

/// State shared by every node implementation.
pub struct NodeCore<T: NodeValue> {
    id: NodeId,
    name: String,
    state: Mutex<NodeState<T>>,
    output_changed: Subject<Option<T>>,
    scope: DisposeScope,
}

impl<T: NodeValue> NodeCore<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let id = NodeId::next();
        Self {
            id,
            name: name.into(),
            state: Mutex::new(NodeState {
                input: None,
                output: None,
                pass_through: false,
                pass_through_next_input: false,
                disposed: false,
            }),
            output_changed: Subject::new(),
            scope: DisposeScope::new(id),
        }
    }

    /// A core that starts in pass-through mode.
    pub fn pass_through(name: impl Into<String>) -> Self {
        let core = Self::new(name);
        lock(&core.state).pass_through = true;
        core
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> Option<T> {
        lock(&self.state).input.clone()
    }

    pub fn output(&self) -> Option<T> {
        lock(&self.state).output.clone()
    }

    pub fn is_pass_through(&self) -> bool {
        lock(&self.state).pass_through
    }

    pub fn is_pass_through_on_next_input(&self) -> bool {
        lock(&self.state).pass_through_next_input
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.state).disposed
    }

    /// Stream of every published output.
    pub fn output_changed(&self) -> &Subject<Option<T>> {
        &self.output_changed
    }

    /// Resources torn down together with this node.
    pub fn scope(&self) -> &DisposeScope {
        &self.scope
    }

    /// Store an input write and apply the pass-through rules.
    ///
    /// Returns `true` when the owning node should process the input itself,
    /// `false` when pass-through already turned it into the output.
    pub fn accept_input(&self, value: Option<T>) -> bool {
        let passed = {
            let mut state = lock(&self.state);
            if state.disposed {
                tracing::trace!("{} ({}) ignoring input after dispose", self.name, self.id);
                return false;
            }
            state.input = value.clone();
            if state.pass_through_next_input {
                state.pass_through = true;
                state.pass_through_next_input = false;
            }
            if state.pass_through {
                state.output = value.clone();
                true
            } else {
                false
            }
        };

        if passed {
            self.output_changed.emit(&value);
        }
        !passed
    }

    /// Store an input without processing it.
    pub fn record_input(&self, value: Option<T>) {
        lock(&self.state).input = value;
    }

    /// Explicit output decision: publishes `value` and clears both
    /// pass-through flags.
    pub fn set_output(&self, value: Option<T>) {
        {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            state.pass_through = false;
            state.pass_through_next_input = false;
            state.output = value.clone();
        }
        self.output_changed.emit(&value);
    }

    /// Publish `value` without touching the pass-through flags.
    pub fn emit_output(&self, value: Option<T>) {
        {
            let mut state = lock(&self.state);
            if state.disposed {
                return;
            }
            state.output = value.clone();
        }
        self.output_changed.emit(&value);
    }

    /// Turn pass-through on (mirroring the current input to the output) or off.
    pub fn set_pass_through(&self, on: bool) {
        let emit = {
            let mut state = lock(&self.state);
            state.pass_through = on;
            state.pass_through_next_input = false;
            if on && !state.disposed && state.output != state.input {
                state.output = state.input.clone();
                Some(state.output.clone())
            } else {
                None
            }
        };
        if let Some(value) = emit {
            self.output_changed.emit(&value);
        }
    }

    /// Change the pass-through flags without publishing anything.
    pub fn set_pass_through_flag(&self, on: bool) {
        let mut state = lock(&self.state);
        state.pass_through = on;
        state.pass_through_next_input = false;
    }

    /// Arm pass-through for the next input write, keeping the current output.
    pub fn arm_pass_through_on_next_input(&self) {
        let mut state = lock(&self.state);
        state.pass_through = false;
        state.pass_through_next_input = true;
    }

    /// Release every resource in the scope. Failures are logged and returned
    /// as one error; the node is marked disposed either way.
    pub fn dispose(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
        }
        tracing::trace!("Disposing {} ({})", self.name, self.id);
        let failures = self.scope.dispose_all();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(first.with_context(format!("disposing {} ({})", self.name, self.id))),
        }
    }
}

/// The surface every pipeline node exposes.
pub trait PipelineNode<T: NodeValue>: Send + Sync {
    fn core(&self) -> &NodeCore<T>;

    /// Processing hook for input writes that pass-through did not consume.
    fn on_input_received(&self, _input: Option<T>) {}

    fn set_input(&self, value: Option<T>) {
        if self.core().accept_input(value.clone()) {
            self.on_input_received(value);
        }
    }

    /// Explicit output decision; clears pass-through.
    fn set_output(&self, value: Option<T>) {
        self.core().set_output(value);
    }

    fn set_pass_through(&self, on: bool) {
        self.core().set_pass_through(on);
    }

    /// One-shot override: publish `value` and hand control back to the
    /// input at the next input write.
    fn change_output_and_pass_through_on_next_input(&self, value: Option<T>) {
        self.set_output(value);
        self.core().arm_pass_through_on_next_input();
    }

    /// Hand control back to the input at the next input write.
    fn pass_through_on_next_input(&self) {
        self.core().arm_pass_through_on_next_input();
    }

    fn id(&self) -> NodeId {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn input(&self) -> Option<T> {
        self.core().input()
    }

    fn output(&self) -> Option<T> {
        self.core().output()
    }

    fn is_pass_through(&self) -> bool {
        self.core().is_pass_through()
    }

    fn subscribe_output(&self, observer: Box<dyn Fn(&Option<T>) + Send + Sync>) -> Subscription {
        self.core().output_changed().subscribe(observer)
    }

    fn dispose(&self) -> Result<()> {
        self.core().dispose()
    }
}

/// Shared handle to a node.
pub type SharedNode<T> = Arc<dyn PipelineNode<T>>;

/// Builds a node for the context it is activated in.
pub type NodeFactory<T> = Arc<dyn Fn(&NodeContext) -> Result<SharedNode<T>> + Send + Sync>;

/// Wrap a closure as a [`NodeFactory`].
pub fn factory<T, F>(f: F) -> NodeFactory<T>
where
    T: NodeValue,
    F: Fn(&NodeContext) -> Result<SharedNode<T>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Everything a node factory may depend on, passed explicitly.
#[derive(Clone)]
pub struct NodeContext {
    /// Device the pipeline drives.
    pub device: DeviceId,
    pub scheduler: SharedScheduler,
    pub config: EngineConfig,
}

impl NodeContext {
    pub fn new(device: impl Into<DeviceId>, scheduler: SharedScheduler, config: EngineConfig) -> Self {
        Self {
            device: device.into(),
            scheduler,
            config,
        }
    }

    pub fn interpolator(&self) -> Interpolator {
        Interpolator::new(self.config.gamma)
    }

    pub fn default_transition_time(&self) -> Duration {
        self.config.default_transition_time()
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("device", &self.device)
            .field("config", &self.config)
            .finish()
    }
}
