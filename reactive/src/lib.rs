#![forbid(unsafe_code)]

//! Reactive values for sigwire.
//!
//! - [`Signal`]: a writable cell; writes that change the value notify dependents.
//! - [`Derived`]: a read-only cell computed lazily from declared dependencies.
//! - [`Effect`]: a callback re-run once per batch of dependency changes.
//! - [`Scope`]: owns all of the above; using a handle after its scope is gone panics.
//!
//! Dependencies are declared up front instead of being tracked while a closure
//! runs, so the graph can be inspected with [`Scope::dependencies`] and cannot
//! contain cycles.
//!
//! ```
//! use sigwire_reactive::Scope;
//!
//! let scope = Scope::new();
//! let z = scope.signal(5);
//! let reader = z.clone();
//! let _log = scope.effect(&[&z], move || println!("z value: {}", reader.get()));
//! z.update(|v| v + 1);
//! ```
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); handles are `!Send`.

mod derived;
mod effect;
mod runtime;
mod scope;
mod signal;

pub use derived::Derived;
pub use effect::Effect;
pub use runtime::{NodeId, NodeKind, ScopeId};
pub use scope::Scope;
pub use signal::Signal;

/// Anything an effect or derived cell can depend on.
pub trait Source {
    fn node_id(&self) -> NodeId;
    fn scope_id(&self) -> ScopeId;
}
