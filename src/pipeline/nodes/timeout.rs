//! TimeoutNode: revert to off after inactivity.
//!
//! Wraps a child node and follows its output until no refresh has arrived
//! for the configured window. It then switches to an instant "off" once and
//! arms pass-through, so the next input is shown as-is instead of being
//! forced off again. A refresh restarts the window; it does not undo an
//! expiry that already fired.

use crate::pipeline::node::{NodeContext, NodeCore, PipelineNode, SharedNode};
use crate::pipeline::observable::{Debouncer, Subject};
use crate::pipeline::scope::OnDispose;
use crate::types::Transition;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub struct TimeoutNode {
    core: NodeCore<Transition>,
    child: SharedNode<Transition>,
    debouncer: Arc<Debouncer>,
    expired: AtomicBool,
    weak_self: Weak<TimeoutNode>,
}

impl TimeoutNode {
    /// Wrap `child`; the idle window starts immediately.
    pub fn new(ctx: &NodeContext, child: SharedNode<Transition>, timeout: Duration) -> Arc<Self> {
        let node = Arc::new_cyclic(|weak| Self {
            core: NodeCore::new("Timeout"),
            child,
            debouncer: Arc::new(Debouncer::new(ctx.scheduler.clone(), timeout)),
            expired: AtomicBool::new(false),
            weak_self: weak.clone(),
        });
        node.core.emit_output(node.child.output());

        let child = node.child.clone();
        node.core.scope().add(OnDispose(move || child.dispose()));
        let debouncer = node.debouncer.clone();
        node.core.scope().add(OnDispose(move || -> crate::error::Result<()> {
            debouncer.cancel();
            Ok(())
        }));

        let weak = Arc::downgrade(&node);
        let subscription = node.child.subscribe_output(Box::new(move |value: &Option<Transition>| {
            if let Some(node) = weak.upgrade() {
                node.on_child_output(value.clone());
            }
        }));
        node.core.scope().add(subscription);

        node.refresh();
        node
    }

    /// Wrap `child` when the context configures an idle timeout, otherwise
    /// return it unchanged.
    pub fn wrap_idle(ctx: &NodeContext, child: SharedNode<Transition>) -> SharedNode<Transition> {
        match ctx.config.idle_timeout() {
            Some(timeout) => TimeoutNode::new(ctx, child, timeout),
            None => child,
        }
    }

    pub fn child(&self) -> &SharedNode<Transition> {
        &self.child
    }

    pub fn timeout(&self) -> Duration {
        self.debouncer.window()
    }

    /// Whether the node is in its dormant period.
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Restart the idle window.
    pub fn refresh(&self) {
        self.expired.store(false, Ordering::SeqCst);
        let weak = self.weak_self.clone();
        self.debouncer.trigger(Box::new(move || {
            if let Some(node) = weak.upgrade() {
                node.expire();
            }
        }));
    }

    /// Refresh on every event of `events` for as long as this node lives.
    pub fn bind_refresh(&self, events: &Subject<()>) {
        let weak = self.weak_self.clone();
        let subscription = events.subscribe(move |_| {
            if let Some(node) = weak.upgrade() {
                node.refresh();
            }
        });
        self.core.scope().add(subscription);
    }

    fn expire(&self) {
        if self.expired.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("{} ({}) idle for {:?}, turning off", self.core.name(), self.core.id(), self.timeout());
        self.change_output_and_pass_through_on_next_input(Some(Transition::off()));
    }

    fn on_child_output(&self, value: Option<Transition>) {
        if !self.is_expired() {
            self.core.set_output(value);
        }
    }
}

impl PipelineNode<Transition> for TimeoutNode {
    fn core(&self) -> &NodeCore<Transition> {
        &self.core
    }

    fn set_input(&self, value: Option<Transition>) {
        // Within the dormant period the armed pass-through publishes the
        // input; otherwise only the child's decision is published.
        if self.is_expired() {
            self.core.accept_input(value.clone());
        } else {
            self.core.record_input(value.clone());
        }
        self.child.set_input(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::nodes::basic::{MapNode, PassThroughNode};
    use crate::scheduler::VirtualScheduler;
    use crate::types::Parameters;
    use std::sync::Mutex;

    const WINDOW: Duration = Duration::from_secs(10);

    fn setup(child: SharedNode<Transition>) -> (Arc<VirtualScheduler>, Arc<TimeoutNode>) {
        let scheduler = Arc::new(VirtualScheduler::new());
        let ctx = NodeContext::new("light", scheduler.clone(), EngineConfig::default());
        (scheduler, TimeoutNode::new(&ctx, child, WINDOW))
    }

    fn dim_to_200() -> SharedNode<Transition> {
        Arc::new(MapNode::new("scene", |_t: &Transition| {
            Transition::instant(Parameters::with_brightness(200.0))
        }))
    }

    #[test]
    fn test_follows_child_until_expiry() {
        let (scheduler, node) = setup(Arc::new(PassThroughNode::<Transition>::new()));
        node.set_input(Some(Transition::on()));
        assert_eq!(node.output(), Some(Transition::on()));

        scheduler.advance_by(WINDOW - Duration::from_millis(1));
        assert_eq!(node.output(), Some(Transition::on()));
        scheduler.advance_by(Duration::from_millis(1));
        assert_eq!(node.output(), Some(Transition::off()));
        assert!(node.is_expired());
    }

    #[test]
    fn test_refresh_restarts_window() {
        let (scheduler, node) = setup(Arc::new(PassThroughNode::<Transition>::new()));
        node.set_input(Some(Transition::on()));
        scheduler.advance_by(Duration::from_secs(8));
        node.refresh();
        scheduler.advance_by(Duration::from_secs(8));
        assert_eq!(node.output(), Some(Transition::on()));
        scheduler.advance_by(Duration::from_secs(2));
        assert_eq!(node.output(), Some(Transition::off()));
    }

    #[test]
    fn test_off_fires_once_per_dormant_period() {
        let (scheduler, node) = setup(Arc::new(PassThroughNode::<Transition>::new()));
        let offs = Arc::new(Mutex::new(0));
        let o = offs.clone();
        let _sub = node.core().output_changed().subscribe(move |v: &Option<Transition>| {
            if v.as_ref() == Some(&Transition::off()) {
                *o.lock().unwrap() += 1;
            }
        });
        scheduler.advance_by(WINDOW * 5);
        assert_eq!(*offs.lock().unwrap(), 1);
    }

    #[test]
    fn test_input_after_expiry_passes_through() {
        let (scheduler, node) = setup(dim_to_200());
        node.set_input(Some(Transition::on()));
        assert_eq!(node.output(), Some(Transition::instant(Parameters::with_brightness(200.0))));

        scheduler.advance_by(WINDOW);
        assert_eq!(node.output(), Some(Transition::off()));

        let manual = Transition::instant(Parameters::with_brightness(30.0));
        node.set_input(Some(manual.clone()));
        assert_eq!(node.output(), Some(manual));
        assert!(node.is_pass_through());
    }

    #[test]
    fn test_refresh_after_expiry_waits_for_child() {
        let (scheduler, node) = setup(dim_to_200());
        scheduler.advance_by(WINDOW);
        node.refresh();
        assert_eq!(node.output(), Some(Transition::off()));

        node.set_input(Some(Transition::on()));
        assert_eq!(node.output(), Some(Transition::instant(Parameters::with_brightness(200.0))));
        assert!(!node.is_pass_through());
    }

    #[test]
    fn test_input_after_refreshed_expiry_emits_once() {
        let (scheduler, node) = setup(dim_to_200());
        scheduler.advance_by(WINDOW);
        node.refresh();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = node
            .core()
            .output_changed()
            .subscribe(move |v: &Option<Transition>| s.lock().unwrap().push(v.clone()));

        node.set_input(Some(Transition::on()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(Transition::instant(Parameters::with_brightness(200.0)))]
        );
        assert_eq!(node.input(), Some(Transition::on()));
    }

    #[test]
    fn test_bound_refresh_events() {
        let (scheduler, node) = setup(Arc::new(PassThroughNode::<Transition>::new()));
        let motion = Subject::new();
        node.bind_refresh(&motion);
        scheduler.advance_by(Duration::from_secs(9));
        motion.emit(&());
        scheduler.advance_by(Duration::from_secs(9));
        assert!(!node.is_expired());
    }

    #[test]
    fn test_dispose_stops_timer_and_child() {
        let child: Arc<PassThroughNode<Transition>> = Arc::new(PassThroughNode::new());
        let (scheduler, node) = setup(child.clone());
        node.dispose().unwrap();
        scheduler.advance_by(WINDOW * 2);
        assert!(!node.is_expired());
        assert!(child.core().is_disposed());
    }
}
