//! Scope Chain - Hierarchical variable scopes
//!
//! Scopes own the variables created in them and share ownership of their
//! parent. A per-thread stack tracks the active scope; guards restore the
//! previous one on exit.

pub mod graph;
pub mod resolver;
pub mod stack;

pub use graph::{Scope, ScopeFrame, ScopeId, ScopeKind, ScopeSnapshot};
pub use resolver::Resolution;
pub use stack::{
    create_or_get_variable, current, enter_new_child, enter_new_child_with_kind, lookup,
    ScopeGuard, ScopeStack,
};
