//! Owner of a set of reactive nodes.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::Source;
use crate::derived::{Derived, DerivedInner};
use crate::effect::Effect;
use crate::runtime::{NodeId, NodeKind, Runtime, ScopeId};
use crate::signal::Signal;

/// Creates signals, derived cells and effects, and owns all of them.
///
/// Dropping (or disposing) the scope destroys every node it created; handles
/// that outlive it panic on use.
pub struct Scope {
    runtime: Rc<Runtime>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.runtime.id())
            .field("nodes", &self.runtime.node_count())
            .field("disposed", &self.runtime.is_disposed())
            .finish()
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtime: Rc::new(Runtime::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.runtime.id()
    }

    /// Allocate a writable cell holding `initial`.
    pub fn signal<T: Clone + PartialEq + 'static>(&self, initial: T) -> Signal<T> {
        self.runtime.assert_live("scope");
        let id = self.runtime.add_node(NodeKind::Signal, Vec::new(), None, None);
        Signal::new(Rc::clone(&self.runtime), id, initial)
    }

    /// Declare a derived cell over `deps`. Nothing is computed until the first read.
    ///
    /// # Panics
    ///
    /// Panics if a dependency belongs to another scope.
    pub fn derive<T: Clone + PartialEq + 'static>(
        &self,
        deps: &[&dyn Source],
        compute: impl Fn() -> T + 'static,
    ) -> Derived<T> {
        self.runtime.assert_live("scope");
        let deps = self.own_dependencies(deps);
        let dirty = Rc::new(Cell::new(true));
        let id = self
            .runtime
            .add_node(NodeKind::Derived, deps, Some(Rc::clone(&dirty)), None);
        let derived = Derived::new(
            Rc::clone(&self.runtime),
            id,
            DerivedInner::new(Box::new(compute), dirty),
        );
        let hook = derived.clone();
        self.runtime.set_refresh(id, Rc::new(move || hook.refresh()));
        derived
    }

    /// Register `run` against `deps`. It runs once now, then once per batch in
    /// which any dependency changed. A derived dependency counts as changed only
    /// when it recomputes to a different value.
    ///
    /// # Panics
    ///
    /// Panics if a dependency belongs to another scope.
    pub fn effect(&self, deps: &[&dyn Source], run: impl Fn() + 'static) -> Effect {
        self.runtime.assert_live("scope");
        let deps = self.own_dependencies(deps);
        let run: Rc<dyn Fn()> = Rc::new(run);
        let id = self
            .runtime
            .add_node(NodeKind::Effect, deps, None, Some(run));
        self.runtime.run_effect(id);
        Effect::new(Rc::clone(&self.runtime), id)
    }

    /// Group writes so that each affected effect runs once, after `f` returns.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.runtime.assert_live("scope");
        self.runtime.batch(f)
    }

    /// Declared dependencies of `node`, in declaration order.
    #[must_use]
    pub fn dependencies(&self, node: NodeId) -> Vec<NodeId> {
        self.runtime.dependencies(node)
    }

    #[must_use]
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.runtime.kind(node)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.runtime.node_count()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.runtime.is_disposed()
    }

    /// Destroy every node. Idempotent.
    pub fn dispose(&self) {
        self.runtime.dispose();
    }

    fn own_dependencies(&self, deps: &[&dyn Source]) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(deps.len());
        for dep in deps {
            assert!(
                dep.scope_id() == self.runtime.id(),
                "dependency {} belongs to another scope",
                dep.node_id()
            );
            let id = dep.node_id();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.runtime.dispose();
    }
}
