//! Push-based event streams.
//!
//! A [`Subject`] multicasts values synchronously to its observers. Observers
//! are snapshotted before each emission and called outside the subject's
//! lock, so an observer may subscribe, unsubscribe or emit on other subjects
//! while being notified.
//!
//! Combinators:
//! - [`Subject::merge`] - one stream fed by several sources
//! - [`Debouncer`] - fire once after a quiet window over the scheduler
//!
//! "Take until" is expressed through ownership: a [`Subscription`] stops the
//! flow when it is dropped, so storing it in the owner's dispose scope ends
//! the stream together with the owner.

use crate::scheduler::{ScheduledHandle, SharedScheduler, Task};
use crate::sync::lock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubjectInner<T> {
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_id: AtomicU64,
    upstream: Mutex<Vec<Subscription>>,
}

/// Synchronous multicast stream.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                upstream: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register `observer`. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.observers).push((id, Arc::new(observer)));

        let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.observers).retain(|(oid, _)| *oid != id);
            }
        })
    }

    /// Deliver `value` to every current observer.
    pub fn emit(&self, value: &T) {
        let observers: Vec<Observer<T>> = lock(&self.inner.observers)
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer(value);
        }
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// A subject that re-emits everything emitted by `sources`.
    ///
    /// The merged subject owns its upstream subscriptions; they end when the
    /// last clone of the merged subject is dropped.
    pub fn merge(sources: &[&Subject<T>]) -> Subject<T> {
        let merged = Subject::new();
        let subscriptions: Vec<Subscription> = sources
            .iter()
            .map(|source| {
                let weak = Arc::downgrade(&merged.inner);
                source.subscribe(move |value: &T| {
                    if let Some(inner) = weak.upgrade() {
                        Subject { inner }.emit(value);
                    }
                })
            })
            .collect();
        lock(&merged.inner.upstream).extend(subscriptions);
        merged
    }
}

/// Registration handle returned by [`Subject::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription to nothing.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Runs a task once no trigger has arrived for `window`.
///
/// Each [`Debouncer::trigger`] cancels the previously pending task and
/// schedules the new one, so at most one task is pending at any time.
pub struct Debouncer {
    scheduler: SharedScheduler,
    window: Duration,
    /// (scheduled task, "has fired" marker)
    pending: Mutex<Option<(ScheduledHandle, ScheduledHandle)>>,
}

impl Debouncer {
    pub fn new(scheduler: SharedScheduler, window: Duration) -> Self {
        Self {
            scheduler,
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the quiet window with `on_quiet` as the task to run.
    pub fn trigger(&self, on_quiet: Task) {
        let mut pending = lock(&self.pending);
        if let Some((previous, _)) = pending.take() {
            previous.cancel();
        }
        let fired = ScheduledHandle::new();
        let marker = fired.clone();
        let handle = self.scheduler.schedule_after(
            self.window,
            Box::new(move || {
                marker.cancel();
                on_quiet();
            }),
        );
        *pending = Some((handle, fired));
    }

    /// Drop the pending task, if any.
    pub fn cancel(&self) {
        if let Some((previous, _)) = lock(&self.pending).take() {
            previous.cancel();
        }
    }

    /// Whether a task is waiting for the window to close.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|(handle, fired)| !handle.is_cancelled() && !fired.is_cancelled())
    }
}
