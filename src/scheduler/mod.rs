//! Time and deferred execution.
//!
//! Every time-dependent node reads "now" and defers work through the
//! [`Scheduler`] trait, so the same pipeline runs against wall-clock time
//! ([`ThreadScheduler`]) or a deterministic virtual clock
//! ([`VirtualScheduler`]) in tests and simulations.

pub mod thread;
pub mod virtual_time;

pub use thread::ThreadScheduler;
pub use virtual_time::VirtualScheduler;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler shared between nodes.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// Source of "now" and of deferred execution.
pub trait Scheduler: Send + Sync {
    /// Current instant on this scheduler's clock.
    fn now(&self) -> Instant;

    /// Run `task` once `delay` has elapsed. The returned handle cancels it.
    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledHandle;
}

/// Cancellation handle for a scheduled task.
///
/// Cancelling is idempotent; a cancelled task never runs.
#[derive(Debug, Clone, Default)]
pub struct ScheduledHandle {
    cancelled: Arc<AtomicBool>,
}

impl ScheduledHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle whose task will never run.
    pub fn cancelled() -> Self {
        let handle = Self::new();
        handle.cancel();
        handle
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
