//! Writable observable cells.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Source;
use crate::runtime::{NodeId, Runtime, ScopeId};

struct SignalInner<T> {
    value: T,
    version: u64,
}

/// A writable value that notifies its dependents when it changes.
///
/// Cloning a `Signal` creates a new handle to the **same** cell.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` is a no-op: no version bump, no notification.
/// 3. Dependents are notified synchronously, unless a batch is open.
pub struct Signal<T> {
    id: NodeId,
    runtime: Rc<Runtime>,
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: Rc::clone(&self.runtime),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub(crate) fn new(runtime: Rc<Runtime>, id: NodeId, value: T) -> Self {
        Self {
            id,
            runtime,
            inner: Rc::new(RefCell::new(SignalInner { value, version: 0 })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.runtime.assert_live("signal");
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.runtime.assert_live("signal");
        f(&self.inner.borrow().value)
    }

    /// Replace the value. Dependents are notified only if it differs from the
    /// current one by `PartialEq`.
    ///
    /// # Panics
    ///
    /// Panics if the scope is disposed, if called from a derived computation,
    /// or if called from an effect that depends on this signal.
    pub fn set(&self, value: T) {
        self.runtime.assert_live("signal");
        self.runtime.assert_writable(self.id);
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.runtime.mark_changed(self.id);
    }

    /// Store whatever `f` returns for the current value.
    ///
    /// An `f` that hands back the value it was given leaves the cell untouched.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Number of value-changing writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.runtime.assert_live("signal");
        self.inner.borrow().version
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T> Source for Signal<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn scope_id(&self) -> ScopeId {
        self.runtime.id()
    }
}
