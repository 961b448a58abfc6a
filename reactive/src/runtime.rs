//! Dependency graph and notification scheduling shared by every handle of a scope.
//!
//! Values live in the handles themselves; the runtime only knows node ids, who
//! depends on whom, and which effects are waiting to run. Dependencies are
//! declared when a node is created and must already exist, so the graph is
//! acyclic by construction.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SCOPE_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of a [`Scope`](crate::Scope). Used to reject cross-scope dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index of a node inside its scope. Ids grow in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Signal,
    Derived,
    Effect,
}

struct Node {
    kind: NodeKind,
    deps: Vec<NodeId>,
    dependents: Vec<NodeId>,
    /// Signals reachable upstream through `deps`.
    sources: BTreeSet<NodeId>,
    /// Staleness flag shared with a derived cell.
    dirty: Option<Rc<Cell<bool>>>,
    /// Brings a derived cell up to date and returns its change count.
    refresh: Option<Rc<dyn Fn() -> u64>>,
    /// Callback of a live effect.
    run: Option<Rc<dyn Fn()>>,
    /// Change counts of an effect's derived dependencies as of its last run.
    observed: Vec<(NodeId, u64)>,
}

/// Restores a `Cell` to its previous value on drop, including during unwinding.
struct Restore<'a, T: Copy> {
    cell: &'a Cell<T>,
    prev: T,
}

impl<'a, T: Copy> Restore<'a, T> {
    fn replace(cell: &'a Cell<T>, value: T) -> Self {
        let prev = cell.replace(value);
        Self { cell, prev }
    }
}

impl<T: Copy> Drop for Restore<'_, T> {
    fn drop(&mut self) {
        self.cell.set(self.prev);
    }
}

pub(crate) struct Runtime {
    id: ScopeId,
    disposed: Cell<bool>,
    nodes: RefCell<Vec<Node>>,
    /// Scheduled effects; `true` when a signal it depends on directly changed.
    pending: RefCell<BTreeMap<NodeId, bool>>,
    batch_depth: Cell<u32>,
    computing: Cell<u32>,
    running_effect: Cell<Option<NodeId>>,
    flushing: Cell<bool>,
}

impl Runtime {
    pub(crate) fn new() -> Self {
        Self {
            id: ScopeId::next(),
            disposed: Cell::new(false),
            nodes: RefCell::new(Vec::new()),
            pending: RefCell::new(BTreeMap::new()),
            batch_depth: Cell::new(0),
            computing: Cell::new(0),
            running_effect: Cell::new(None),
            flushing: Cell::new(false),
        }
    }

    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Use after dispose is a programming error, not a recoverable condition.
    pub(crate) fn assert_live(&self, what: &str) {
        assert!(
            !self.disposed.get(),
            "{what} used after scope was disposed"
        );
    }

    pub(crate) fn add_node(
        &self,
        kind: NodeKind,
        deps: Vec<NodeId>,
        dirty: Option<Rc<Cell<bool>>>,
        run: Option<Rc<dyn Fn()>>,
    ) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());

        let mut sources = BTreeSet::new();
        for dep in &deps {
            let node = &nodes[dep.0];
            if node.kind == NodeKind::Signal {
                sources.insert(*dep);
            } else {
                sources.extend(node.sources.iter().copied());
            }
        }

        for dep in &deps {
            nodes[dep.0].dependents.push(id);
        }

        nodes.push(Node {
            kind,
            deps,
            dependents: Vec::new(),
            sources,
            dirty,
            refresh: None,
            run,
            observed: Vec::new(),
        });
        id
    }

    /// Attach the refresh hook of a derived cell created by `add_node`.
    pub(crate) fn set_refresh(&self, id: NodeId, refresh: Rc<dyn Fn() -> u64>) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(id.0) {
            node.refresh = Some(refresh);
        }
    }

    pub(crate) fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(id.0).map(|n| n.kind)
    }

    pub(crate) fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(id.0)
            .map(|n| n.deps.clone())
            .unwrap_or_default()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Rejects writes from derived computations and writes that would re-trigger
    /// the effect performing them.
    pub(crate) fn assert_writable(&self, id: NodeId) {
        assert!(
            self.computing.get() == 0,
            "signal {id} written while a derived cell was computing; derived cells are read-only transforms"
        );
        if let Some(effect) = self.running_effect.get() {
            let nodes = self.nodes.borrow();
            assert!(
                !nodes[effect.0].sources.contains(&id),
                "effect {effect} wrote to signal {id}, which it depends on"
            );
        }
    }

    /// Guard held while a derived cell runs its compute function.
    pub(crate) fn enter_compute(&self) -> impl Drop + '_ {
        Restore::replace(&self.computing, self.computing.get() + 1)
    }

    /// Marks everything downstream of signal `id` stale and schedules affected
    /// effects. Effects reached only through derived cells are scheduled
    /// tentatively: they run only if one of those cells ends up with a new value.
    pub(crate) fn mark_changed(&self, id: NodeId) {
        {
            let nodes = self.nodes.borrow();
            let mut pending = self.pending.borrow_mut();
            let mut stack: Vec<(NodeId, bool)> =
                nodes[id.0].dependents.iter().map(|&d| (d, true)).collect();
            let mut seen = BTreeSet::new();

            while let Some((next, direct)) = stack.pop() {
                let node = &nodes[next.0];
                match node.kind {
                    NodeKind::Derived => {
                        if !seen.insert(next) {
                            continue;
                        }
                        if let Some(dirty) = &node.dirty {
                            dirty.set(true);
                        }
                        stack.extend(node.dependents.iter().map(|&d| (d, false)));
                    }
                    NodeKind::Effect => {
                        if node.run.is_some() {
                            *pending.entry(next).or_insert(false) |= direct;
                        }
                    }
                    NodeKind::Signal => {}
                }
            }
        }

        if self.batch_depth.get() == 0 {
            self.flush();
        }
    }

    /// Runs `f` with notifications deferred until the outermost batch ends.
    pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = {
            let _depth = Restore::replace(&self.batch_depth, self.batch_depth.get() + 1);
            f()
        };
        if self.batch_depth.get() == 0 {
            self.flush();
        }
        result
    }

    /// Drains pending effects in registration order. Effects scheduled while
    /// draining are picked up by the same loop.
    fn flush(&self) {
        if self.flushing.get() || self.disposed.get() {
            return;
        }
        let _flushing = Restore::replace(&self.flushing, true);

        loop {
            let next = self.pending.borrow_mut().pop_first();
            match next {
                Some((id, true)) => self.run_effect(id),
                Some((id, false)) => {
                    if self.observe_derived(id) {
                        self.run_effect(id);
                    } else {
                        tracing::trace!(scope = self.id.0, effect = %id, "derived inputs unchanged");
                    }
                }
                None => break,
            }
        }
    }

    /// Refreshes the derived dependencies of effect `id` and records their
    /// change counts. Returns whether any differs from the previous record.
    fn observe_derived(&self, id: NodeId) -> bool {
        let hooks: Vec<(NodeId, Rc<dyn Fn() -> u64>)> = {
            let nodes = self.nodes.borrow();
            let Some(node) = nodes.get(id.0) else {
                return false;
            };
            node.deps
                .iter()
                .filter_map(|dep| nodes[dep.0].refresh.clone().map(|r| (*dep, r)))
                .collect()
        };

        let current: Vec<(NodeId, u64)> = hooks
            .into_iter()
            .map(|(dep, refresh)| (dep, refresh()))
            .collect();

        let mut nodes = self.nodes.borrow_mut();
        let Some(node) = nodes.get_mut(id.0) else {
            return false;
        };
        let changed = node.observed != current;
        node.observed = current;
        changed
    }

    pub(crate) fn run_effect(&self, id: NodeId) {
        if self.disposed.get() || !self.is_effect_alive(id) {
            return;
        }
        self.observe_derived(id);
        let run = self.nodes.borrow().get(id.0).and_then(|n| n.run.clone());
        if let Some(run) = run {
            tracing::trace!(scope = self.id.0, effect = %id, "running effect");
            let _running = Restore::replace(&self.running_effect, Some(id));
            run();
        }
    }

    pub(crate) fn remove_effect(&self, id: NodeId) {
        let removed = self
            .nodes
            .borrow_mut()
            .get_mut(id.0)
            .and_then(|n| n.run.take());
        self.pending.borrow_mut().remove(&id);
        drop(removed);
    }

    pub(crate) fn is_effect_alive(&self, id: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(id.0)
            .is_some_and(|n| n.run.is_some())
    }

    /// Drops every effect callback and derived refresh hook and refuses further
    /// use of the scope.
    ///
    /// Callbacks are dropped after the graph borrow is released: they may own
    /// handles into this runtime.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let (callbacks, hooks): (Vec<Rc<dyn Fn()>>, Vec<Rc<dyn Fn() -> u64>>) = {
            let mut nodes = self.nodes.borrow_mut();
            let callbacks = nodes.iter_mut().filter_map(|n| n.run.take()).collect();
            let hooks = nodes.iter_mut().filter_map(|n| n.refresh.take()).collect();
            (callbacks, hooks)
        };
        self.pending.borrow_mut().clear();
        tracing::trace!(
            scope = self.id.0,
            effects = callbacks.len(),
            "scope disposed"
        );
        drop(callbacks);
        drop(hooks);
    }
}
