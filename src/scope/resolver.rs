//! Name resolution results
//!
//! Resolution walks outward through the scope chain:
//! 1. Check the local scope
//! 2. Check each ancestor, nearest first
//! 3. Stop at the root with no match

use super::graph::{Scope, ScopeId};
use crate::variable::VarHandle;

/// Result of resolving a name from some scope
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Handle to the resolved variable
    pub handle: VarHandle,
    /// The scope that owns the variable
    pub scope: Scope,
    /// How many parent hops were needed (0 = local)
    pub distance: usize,
}

impl Resolution {
    pub fn is_local(&self) -> bool {
        self.distance == 0
    }

    pub fn owner(&self) -> ScopeId {
        self.scope.id()
    }
}
