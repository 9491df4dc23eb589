// Same-thread re-entry detection for synchronous fan-out.
//
// A `Gate` serializes sections that call out into user callbacks. A
// thread entering a gate it already holds gets `Reentered` back instead
// of deadlocking, which lets the hub reject publishes issued from inside
// a subscriber and lets `stop()` be called from inside one.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
pub(crate) struct Gate {
    section: Mutex<()>,
    holder: Mutex<Option<ThreadId>>,
}

/// The current thread already holds the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reentered;

pub(crate) struct GateGuard<'a> {
    gate: &'a Gate,
    _section: MutexGuard<'a, ()>,
}

impl Gate {
    /// Enter the gate, blocking while another thread holds it.
    pub(crate) fn enter(&self) -> Result<GateGuard<'_>, Reentered> {
        let me = thread::current().id();
        if *lock(&self.holder) == Some(me) {
            return Err(Reentered);
        }
        let section = lock(&self.section);
        *lock(&self.holder) = Some(me);
        Ok(GateGuard {
            gate: self,
            _section: section,
        })
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.gate.holder) = None;
    }
}

/// Lock a mutex, recovering the data if a panicking callback poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
