//! Variables and weak variable handles
//!
//! A `Variable` carries no payload: it is an identity token owned by exactly
//! one scope. Everything outside the owning scope sees it through a
//! `VarHandle`, which never keeps it alive.

use serde::{Deserialize, Serialize};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_VARIABLE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    fn next() -> Self {
        Self(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

/// A named slot owned by a single scope
#[derive(Debug)]
pub struct Variable {
    id: VariableId,
    name: String,
}

impl Variable {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: VariableId::next(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Non-owning handle to a variable.
///
/// Once the owning scope is dropped, or the entry is removed from it, every
/// accessor reports absence instead of touching freed state.
#[derive(Debug, Clone)]
pub struct VarHandle {
    inner: Weak<Variable>,
}

impl VarHandle {
    pub(crate) fn new(variable: &Rc<Variable>) -> Self {
        Self {
            inner: Rc::downgrade(variable),
        }
    }

    /// Whether the variable is still owned by a scope
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Identifier of the variable, if it is still alive
    pub fn id(&self) -> Option<VariableId> {
        self.inner.upgrade().map(|v| v.id())
    }

    /// Name of the variable, if it is still alive
    pub fn name(&self) -> Option<String> {
        self.inner.upgrade().map(|v| v.name().to_string())
    }

    /// Run `f` against the variable if it is still alive.
    ///
    /// The variable is only borrowed for the duration of the call.
    pub fn with<R>(&self, f: impl FnOnce(&Variable) -> R) -> Option<R> {
        self.inner.upgrade().map(|v| f(&v))
    }

    /// Identity comparison; two handles are the same variable if they point
    /// at the same allocation, alive or not.
    pub fn same_variable(&self, other: &VarHandle) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for VarHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_variable(other)
    }
}

impl Eq for VarHandle {}
