//! Ownership tree for node resources.
//!
//! A [`DisposeScope`] owns subscriptions, scheduled tasks, child nodes and
//! nested scopes. Teardown releases them last-in first-out, so anything
//! registered after (and usually built on top of) an earlier resource goes
//! first. A failing resource is logged and recorded; the walk always
//! continues with the remaining ones.

use crate::error::{LightError, Result};
use crate::pipeline::id::NodeId;
use crate::pipeline::observable::Subscription;
use crate::scheduler::ScheduledHandle;
use crate::sync::lock;
use std::sync::Mutex;

/// Something that holds resources and can release them.
pub trait Disposable: Send {
    fn dispose(self: Box<Self>) -> Result<()>;
}

impl Disposable for Subscription {
    fn dispose(self: Box<Self>) -> Result<()> {
        self.unsubscribe();
        Ok(())
    }
}

impl Disposable for ScheduledHandle {
    fn dispose(self: Box<Self>) -> Result<()> {
        self.cancel();
        Ok(())
    }
}

/// Adapter turning a closure into a [`Disposable`].
pub struct OnDispose<F>(pub F);

impl<F> Disposable for OnDispose<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    fn dispose(self: Box<Self>) -> Result<()> {
        (self.0)()
    }
}

/// Resources owned by one node.
pub struct DisposeScope {
    owner: NodeId,
    resources: Mutex<Vec<Box<dyn Disposable>>>,
}

impl DisposeScope {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            resources: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Take ownership of `resource` until the scope is disposed.
    pub fn add(&self, resource: impl Disposable + 'static) {
        lock(&self.resources).push(Box::new(resource));
    }

    pub fn len(&self) -> usize {
        lock(&self.resources).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every resource, newest first, and return the failures.
    pub fn dispose_all(&self) -> Vec<LightError> {
        let resources: Vec<Box<dyn Disposable>> = std::mem::take(&mut *lock(&self.resources));
        let mut failures = Vec::new();
        for resource in resources.into_iter().rev() {
            if let Err(e) = resource.dispose() {
                tracing::warn!("Resource of {} failed to dispose: {}", self.owner, e);
                failures.push(e);
            }
        }
        failures
    }
}

impl Disposable for DisposeScope {
    fn dispose(self: Box<Self>) -> Result<()> {
        let owner = self.owner;
        let failures = self.dispose_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LightError::Dispose {
                node: owner,
                message: failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            })
        }
    }
}
