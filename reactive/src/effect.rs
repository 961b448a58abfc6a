//! Side-effecting callbacks re-run when their declared dependencies change.

use std::fmt;
use std::rc::Rc;

use crate::runtime::{NodeId, Runtime};

/// Handle to a registered effect.
///
/// The effect belongs to its scope, not to this handle: dropping the handle
/// keeps the effect running. Call [`Effect::destroy`] to stop it early.
pub struct Effect {
    id: NodeId,
    runtime: Rc<Runtime>,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Effect {
    pub(crate) fn new(runtime: Rc<Runtime>, id: NodeId) -> Self {
        Self { id, runtime }
    }

    /// Stop the effect. A pending run scheduled by the current batch is dropped.
    pub fn destroy(&self) {
        self.runtime.remove_effect(self.id);
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.runtime.is_disposed() && self.runtime.is_effect_alive(self.id)
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}
