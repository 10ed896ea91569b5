//! TransitionNode: scheduled, resumable interpolation.
//!
//! Every input write remembers where the previous transition was heading
//! (`source`), where the new one is heading (`destination`) and the time
//! window it covers. When a transition replaces one that is still running,
//! the node first emits an instant frame at the interpolated position the
//! light has actually reached, then schedules the rest of the transition
//! one short-transition period later.
//!
//! At most one continuation is pending per node. Any new input, explicit
//! output or pass-through toggle cancels it.

use crate::color::Interpolator;
use crate::pipeline::node::{NodeContext, NodeCore, PipelineNode};
use crate::scheduler::{ScheduledHandle, SharedScheduler};
use crate::sync::lock;
use crate::types::{Parameters, Transition};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

type DestinationFn = Box<dyn Fn(&Transition) -> Option<Parameters> + Send + Sync>;

#[derive(Default)]
struct TransitionState {
    source: Option<Parameters>,
    destination: Option<Parameters>,
    start: Option<Instant>,
    end: Option<Instant>,
    pending: Option<ScheduledHandle>,
    /// Bumped on every cancellation so a continuation that already left the
    /// scheduler queue can tell it is stale.
    generation: u64,
    last_error: Option<String>,
}

impl TransitionState {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }
}

/// Node producing smooth hand-offs between transitions.
pub struct TransitionNode {
    core: NodeCore<Transition>,
    scheduler: SharedScheduler,
    interpolator: Interpolator,
    /// Transitions ending sooner than this are applied instantly
    short_transition: Duration,
    destination_fn: DestinationFn,
    state: Mutex<TransitionState>,
    weak_self: Weak<TransitionNode>,
}

impl TransitionNode {
    /// Heads for whatever parameters the input carries.
    pub fn new(ctx: &NodeContext) -> Arc<Self> {
        Self::with_destination(ctx, "Transition", |input| Some(input.parameters.clone()))
    }

    /// Heads for `destination(input)`.
    pub fn with_destination<F>(ctx: &NodeContext, name: impl Into<String>, destination: F) -> Arc<Self>
    where
        F: Fn(&Transition) -> Option<Parameters> + Send + Sync + 'static,
    {
        let name = name.into();
        Arc::new_cyclic(|weak| Self {
            core: NodeCore::new(name),
            scheduler: ctx.scheduler.clone(),
            interpolator: ctx.interpolator(),
            short_transition: ctx.default_transition_time(),
            destination_fn: Box::new(destination),
            state: Mutex::new(TransitionState::default()),
            weak_self: weak.clone(),
        })
    }

    pub fn source(&self) -> Option<Parameters> {
        lock(&self.state).source.clone()
    }

    pub fn destination(&self) -> Option<Parameters> {
        lock(&self.state).destination.clone()
    }

    /// Whether a continuation is waiting to fire.
    pub fn has_pending(&self) -> bool {
        lock(&self.state)
            .pending
            .as_ref()
            .is_some_and(|h| !h.is_cancelled())
    }

    /// Message of the last interpolation failure, if any.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    fn cancel_pending(&self) {
        lock(&self.state).cancel_pending();
    }

    fn apply_remembered(&self) {
        let (destination, start, end) = {
            let state = lock(&self.state);
            (state.destination.clone(), state.start, state.end)
        };
        self.apply(destination, start, end);
    }

    fn emit(&self, transition: Option<Transition>) {
        tracing::trace!("{} ({}) emits {:?}", self.core.name(), self.core.id(), transition);
        self.core.emit_output(transition);
    }

    fn apply(&self, destination: Option<Parameters>, start: Option<Instant>, end: Option<Instant>) {
        let now = self.scheduler.now();

        let Some(destination) = destination else {
            self.emit(None);
            return;
        };
        let Some(end) = end else {
            self.emit(Some(Transition::instant(destination)));
            return;
        };
        let remaining = end.saturating_duration_since(now);
        if remaining <= self.short_transition {
            self.emit(Some(Transition::instant(destination)));
            return;
        }

        let source = lock(&self.state).source.clone();
        let (Some(source), Some(start)) = (source, start) else {
            // No history: let the device run its own transition.
            self.emit(Some(Transition::over(destination, remaining)));
            return;
        };

        let total = end.saturating_duration_since(start);
        let progress = if total.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(start).as_secs_f64() / total.as_secs_f64()
        };

        let frame = match self.interpolator.interpolate(&source, &destination, progress) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("{} ({}): {}", self.core.name(), self.core.id(), e);
                lock(&self.state).last_error = Some(e.to_string());
                self.emit(Some(Transition::over(destination, remaining)));
                return;
            }
        };

        let continuation = Transition::over(destination.clone(), remaining - self.short_transition);
        {
            let mut state = lock(&self.state);
            state.cancel_pending();
            let generation = state.generation;
            let weak = self.weak_self.clone();
            let handle = self.scheduler.schedule_after(
                self.short_transition,
                Box::new(move || {
                    if let Some(node) = weak.upgrade() {
                        node.continue_transition(generation, continuation);
                    }
                }),
            );
            state.pending = Some(handle);
        }

        tracing::debug!(
            "{} ({}) resuming at {:.0}% towards {}",
            self.core.name(),
            self.core.id(),
            progress.clamp(0.0, 1.0) * 100.0,
            destination
        );
        self.emit(Some(Transition::instant(frame)));
    }

    fn continue_transition(&self, generation: u64, transition: Transition) {
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return;
            }
            state.pending = None;
        }
        self.emit(Some(transition));
    }
}

impl PipelineNode<Transition> for TransitionNode {
    fn core(&self) -> &NodeCore<Transition> {
        &self.core
    }

    fn set_input(&self, value: Option<Transition>) {
        let now = self.scheduler.now();
        {
            let mut state = lock(&self.state);
            state.cancel_pending();
            state.source = state.destination.take();
            state.destination = value.as_ref().and_then(|t| (self.destination_fn)(t));
            state.start = Some(now);
            state.end = value
                .as_ref()
                .and_then(|t| t.duration)
                .filter(|d| !d.is_zero())
                .map(|d| now + d);
        }
        if self.core.accept_input(value.clone()) {
            self.on_input_received(value);
        }
    }

    fn on_input_received(&self, _input: Option<Transition>) {
        self.apply_remembered();
    }

    fn set_output(&self, value: Option<Transition>) {
        self.cancel_pending();
        self.core.set_output(value);
    }

    /// Turning pass-through on replays the remembered transition instead of
    /// jumping to the literal input.
    fn set_pass_through(&self, on: bool) {
        self.cancel_pending();
        self.core.set_pass_through_flag(on);
        if on {
            self.apply_remembered();
        }
    }

    fn dispose(&self) -> crate::error::Result<()> {
        self.cancel_pending();
        self.core.dispose()
    }
}
