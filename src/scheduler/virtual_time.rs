//! Deterministic virtual clock.
//!
//! Time only moves when the owner calls [`VirtualScheduler::advance_by`],
//! [`VirtualScheduler::advance_to`] or [`VirtualScheduler::run_until_idle`].
//! Tasks due at the same instant run in the order they were scheduled, and
//! every task runs with the clock set to its due time.

use crate::sync::lock;
use crate::scheduler::{ScheduledHandle, Scheduler, Task};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Upper bound on tasks executed by one `run_until_idle` call.
const MAX_IDLE_ITERATIONS: usize = 100_000;

struct PendingTask {
    task: Task,
    handle: ScheduledHandle,
}

#[derive(Default)]
struct VirtualState {
    elapsed: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), PendingTask>,
}

/// Scheduler driven by explicit time advancement.
pub struct VirtualScheduler {
    origin: Instant,
    state: Mutex<VirtualState>,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(VirtualState::default()),
        }
    }

    /// The instant this clock reports at elapsed zero.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        lock(&self.state).elapsed
    }

    /// Number of scheduled tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        lock(&self.state)
            .queue
            .values()
            .filter(|p| !p.handle.is_cancelled())
            .count()
    }

    /// Move the clock forward by `delta`, running every task that falls due.
    pub fn advance_by(&self, delta: Duration) {
        let target = self.elapsed() + delta;
        self.advance_to(target);
    }

    /// Move the clock to `target` (elapsed since origin), running due tasks.
    /// Moving backwards is a no-op.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let next = {
                let mut state = lock(&self.state);
                let key = state
                    .queue
                    .keys()
                    .next()
                    .copied()
                    .filter(|(due, _)| *due <= target);
                match key {
                    Some(key) => {
                        if key.0 > state.elapsed {
                            state.elapsed = key.0;
                        }
                        state.queue.remove(&key)
                    }
                    None => None,
                }
            };

            match next {
                Some(pending) if !pending.handle.is_cancelled() => (pending.task)(),
                Some(_) => {}
                None => break,
            }
        }

        let mut state = lock(&self.state);
        if target > state.elapsed {
            state.elapsed = target;
        }
    }

    /// Run tasks until nothing is pending, advancing the clock as needed.
    pub fn run_until_idle(&self) {
        for _ in 0..MAX_IDLE_ITERATIONS {
            let next_due = {
                let mut state = lock(&self.state);
                state.queue.retain(|_, p| !p.handle.is_cancelled());
                state.queue.keys().next().map(|(due, _)| *due)
            };
            match next_due {
                Some(due) => self.advance_to(due),
                None => return,
            }
        }
        tracing::warn!(
            "Virtual scheduler still busy after {} iterations",
            MAX_IDLE_ITERATIONS
        );
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> ScheduledHandle {
        let handle = ScheduledHandle::new();
        let mut state = lock(&self.state);
        let due = state.elapsed + delay;
        let seq = state.seq;
        state.seq += 1;
        state.queue.insert(
            (due, seq),
            PendingTask {
                task,
                handle: handle.clone(),
            },
        );
        handle
    }
}
