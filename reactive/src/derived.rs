//! Lazy, memoized read-only cells computed from declared dependencies.
//!
//! # Invariants
//!
//! 1. `get()` never returns a value computed from stale dependencies.
//! 2. The compute function runs at most once per dependency change cycle, and
//!    only when the value is actually read.
//! 3. A compute function that writes to any signal panics.
//! 4. The version only moves when a recomputation yields a different value, so
//!    effects over a derived cell skip recomputations that change nothing.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::Source;
use crate::runtime::{NodeId, Runtime, ScopeId};

pub(crate) struct DerivedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    dirty: Rc<Cell<bool>>,
    version: Cell<u64>,
}

impl<T> DerivedInner<T> {
    pub(crate) fn new(compute: Box<dyn Fn() -> T>, dirty: Rc<Cell<bool>>) -> Self {
        Self {
            compute,
            cached: RefCell::new(None),
            dirty,
            version: Cell::new(0),
        }
    }
}

/// A read-only cell whose value is a pure function of other cells.
///
/// Cloning a `Derived` creates a new handle to the **same** cache.
pub struct Derived<T> {
    id: NodeId,
    runtime: Rc<Runtime>,
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: Rc::clone(&self.runtime),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.id)
            .field("cached", &self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    pub(crate) fn new(runtime: Rc<Runtime>, id: NodeId, inner: DerivedInner<T>) -> Self {
        Self {
            id,
            runtime,
            inner: Rc::new(inner),
        }
    }

    /// Current value, recomputed first if any dependency changed since the last read.
    #[must_use]
    pub fn get(&self) -> T {
        self.runtime.assert_live("derived cell");

        if !self.inner.dirty.get()
            && let Some(value) = self.inner.cached.borrow().as_ref()
        {
            return value.clone();
        }

        let value = {
            let _computing = self.runtime.enter_compute();
            (self.inner.compute)()
        };
        let previous = self.inner.cached.replace(Some(value.clone()));
        self.inner.dirty.set(false);
        if previous.as_ref() != Some(&value) {
            self.inner.version.set(self.inner.version.get() + 1);
        }
        value
    }

    /// Whether the next `get()` will recompute.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.runtime.assert_live("derived cell");
        self.inner.dirty.get() || self.inner.cached.borrow().is_none()
    }

    /// Number of distinct values computed so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.runtime.assert_live("derived cell");
        self.inner.version.get()
    }

    /// Recompute if stale and report the version; the scheduler's view of the cell.
    pub(crate) fn refresh(&self) -> u64 {
        let _ = self.get();
        self.inner.version.get()
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T> Source for Derived<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn scope_id(&self) -> ScopeId {
        self.runtime.id()
    }
}
