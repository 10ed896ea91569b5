//! Lock helpers.
//!
//! Node state is only ever mutated through short, non-panicking critical
//! sections, so a poisoned mutex still holds consistent data and is recovered
//! instead of propagating the panic.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
