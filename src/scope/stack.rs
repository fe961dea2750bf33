//! Active-scope stack and restore guard
//!
//! A `ScopeStack` tracks the currently active scope. Entering a child scope
//! returns a [`ScopeGuard`]; dropping the guard reinstates whatever was
//! active before, whether the region ended normally, through `?`, or by
//! unwinding. Entries therefore nest strictly LIFO.
//!
//! Every thread owns one stack, reachable through [`ScopeStack::thread_local`]
//! and the free functions of [`crate::scope`]. Independent stacks can be
//! created with [`ScopeStack::new`] and passed around explicitly.

use super::graph::{Scope, ScopeKind};
use crate::variable::VarHandle;
use crate::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static THREAD_STACK: ScopeStack = ScopeStack::new();
}

/// Holder of the active scope for one flow of control
#[derive(Clone, Default)]
pub struct ScopeStack {
    active: Rc<RefCell<Option<Scope>>>,
}

impl ScopeStack {
    /// Create an empty stack with no active scope
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's stack
    pub fn thread_local() -> Self {
        THREAD_STACK.with(Clone::clone)
    }

    /// The active scope, if any has been entered
    pub fn current(&self) -> Option<Scope> {
        self.active.borrow().clone()
    }

    /// Number of scopes on the active chain (0 when nothing is active)
    pub fn depth(&self) -> usize {
        self.active
            .borrow()
            .as_ref()
            .map(|scope| scope.depth() + 1)
            .unwrap_or(0)
    }

    /// Enter a new child of the active scope.
    ///
    /// With nothing active the new scope is a root of kind `Module`,
    /// otherwise it is a `Block`.
    pub fn enter_new_child(&self) -> ScopeGuard {
        let kind = if self.active.borrow().is_some() {
            ScopeKind::Block
        } else {
            ScopeKind::Module
        };
        self.enter_new_child_with_kind(kind)
    }

    /// Enter a new child of the active scope with an explicit kind
    pub fn enter_new_child_with_kind(&self, kind: ScopeKind) -> ScopeGuard {
        let previous = self.current();
        let scope = match &previous {
            Some(parent) => Scope::child(parent, kind),
            None => Scope::root(kind),
        };

        tracing::debug!(
            "Entering {} ({}) under {}",
            scope.id(),
            kind,
            previous
                .as_ref()
                .map(|p| p.id().to_string())
                .unwrap_or_else(|| "<none>".to_string())
        );

        *self.active.borrow_mut() = Some(scope.clone());
        ScopeGuard {
            stack: self.clone(),
            scope,
            previous,
        }
    }

    /// Run `f` inside a new child scope.
    ///
    /// The previous scope is active again by the time `f`'s result, or its
    /// panic, reaches the caller.
    pub fn scoped<R>(&self, f: impl FnOnce(&Scope) -> R) -> R {
        let guard = self.enter_new_child();
        f(guard.scope())
    }

    /// Like [`ScopeStack::scoped`] with an explicit kind
    pub fn scoped_with_kind<R>(&self, kind: ScopeKind, f: impl FnOnce(&Scope) -> R) -> R {
        let guard = self.enter_new_child_with_kind(kind);
        f(guard.scope())
    }

    /// Create-or-get `name` in the active scope
    pub fn create_or_get_variable(&self, name: &str) -> Result<VarHandle> {
        self.active
            .borrow()
            .as_ref()
            .map(|scope| scope.create_or_get(name))
            .ok_or(Error::NoActiveScope)
    }

    /// Look up `name` starting at the active scope
    pub fn lookup(&self, name: &str) -> Option<VarHandle> {
        self.active
            .borrow()
            .as_ref()
            .and_then(|scope| scope.lookup(name))
    }
}

impl std::fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeStack")
            .field("active", &self.current().map(|s| s.id()))
            .field("depth", &self.depth())
            .finish()
    }
}

/// Restores the previously active scope when dropped
#[must_use = "the scope is exited as soon as the guard is dropped"]
pub struct ScopeGuard {
    stack: ScopeStack,
    scope: Scope,
    previous: Option<Scope>,
}

impl ScopeGuard {
    /// The scope this guard entered
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The scope that becomes active again on drop
    pub fn previous(&self) -> Option<&Scope> {
        self.previous.as_ref()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let mut active = self.stack.active.borrow_mut();
        let in_order = active
            .as_ref()
            .is_some_and(|current| Scope::ptr_eq(current, &self.scope));
        if !in_order {
            tracing::warn!(
                "{} released out of order; restoring its saved scope anyway",
                self.scope.id()
            );
        }

        tracing::debug!("Leaving {}", self.scope.id());
        *active = self.previous.take();
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", &self.scope.id())
            .field("previous", &self.previous.as_ref().map(|s| s.id()))
            .finish()
    }
}

/// The calling thread's active scope
pub fn current() -> Option<Scope> {
    ScopeStack::thread_local().current()
}

/// Enter a new child scope on the calling thread's stack
pub fn enter_new_child() -> ScopeGuard {
    ScopeStack::thread_local().enter_new_child()
}

/// Enter a new child scope of `kind` on the calling thread's stack
pub fn enter_new_child_with_kind(kind: ScopeKind) -> ScopeGuard {
    ScopeStack::thread_local().enter_new_child_with_kind(kind)
}

/// Create-or-get `name` in the calling thread's active scope
pub fn create_or_get_variable(name: &str) -> Result<VarHandle> {
    ScopeStack::thread_local().create_or_get_variable(name)
}

/// Look up `name` from the calling thread's active scope
pub fn lookup(name: &str) -> Option<VarHandle> {
    ScopeStack::thread_local().lookup(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn active_id(stack: &ScopeStack) -> Option<crate::scope::ScopeId> {
        stack.current().map(|s| s.id())
    }

    #[test]
    fn test_starts_empty() {
        let stack = ScopeStack::new();
        assert!(stack.current().is_none());
        assert_eq!(stack.depth(), 0);
        assert!(stack.lookup("x").is_none());
        assert!(matches!(
            stack.create_or_get_variable("x"),
            Err(Error::NoActiveScope)
        ));
    }

    #[test]
    fn test_first_enter_creates_root() {
        let stack = ScopeStack::new();
        let root = stack.enter_new_child();
        assert!(root.scope().is_root());
        assert_eq!(root.scope().kind(), ScopeKind::Module);
        assert!(root.previous().is_none());

        let child = stack.enter_new_child();
        assert_eq!(child.scope().kind(), ScopeKind::Block);
        assert!(Scope::ptr_eq(child.previous().unwrap(), root.scope()));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_scenario_a_isolation() {
        let stack = ScopeStack::new();
        let root = stack.enter_new_child();
        let x = stack.create_or_get_variable("X").unwrap();
        stack.create_or_get_variable("Y").unwrap();

        let tmp = {
            let _child = stack.enter_new_child();
            stack.create_or_get_variable("TMP").unwrap()
        };

        assert!(Scope::ptr_eq(&stack.current().unwrap(), root.scope()));
        assert!(root.scope().lookup("TMP").is_none());
        assert!(!tmp.is_alive());
        assert_eq!(root.scope().lookup("X"), Some(x.clone()));

        // A sibling entered afterwards does not see the old child's names
        let sibling = stack.enter_new_child();
        assert!(stack.lookup("TMP").is_none());
        assert!(sibling.scope().lookup("TMP").is_none());
        assert_eq!(stack.lookup("X"), Some(x));
    }

    #[test]
    fn test_scenario_b_ancestor_reuse() {
        let stack = ScopeStack::new();
        let _root = stack.enter_new_child();
        let a = stack.create_or_get_variable("A").unwrap();

        let _child = stack.enter_new_child();
        assert_eq!(stack.lookup("A"), Some(a.clone()));
        assert_eq!(stack.create_or_get_variable("A").unwrap(), a);
        assert!(stack.current().unwrap().is_empty());
    }

    #[test]
    fn test_scenario_c_restore_on_error() {
        fn fails_inside(stack: &ScopeStack) -> Result<()> {
            let _child = stack.enter_new_child();
            stack.create_or_get_variable("inner")?;
            Err(Error::Script("raised inside child".to_string()))
        }

        let stack = ScopeStack::new();
        let root = stack.enter_new_child();
        let result = fails_inside(&stack);

        assert!(result.is_err());
        assert_eq!(active_id(&stack), Some(root.scope().id()));
        assert!(stack.lookup("inner").is_none());
    }

    #[test]
    fn test_restore_on_panic() {
        let stack = ScopeStack::new();
        let root = stack.enter_new_child();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            stack.scoped(|_| {
                stack.scoped(|inner| {
                    inner.create_or_get("doomed");
                    panic!("unwinding through two scopes");
                })
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(active_id(&stack), Some(root.scope().id()));
        assert!(stack.lookup("doomed").is_none());
    }

    #[test]
    fn test_lifo_restoration() {
        let stack = ScopeStack::new();
        let mut seen = Vec::new();

        let g1 = stack.enter_new_child();
        seen.push(active_id(&stack));
        {
            let _g2 = stack.enter_new_child();
            {
                let before = active_id(&stack);
                let _g3 = stack.enter_new_child();
                drop(_g3);
                assert_eq!(active_id(&stack), before);
            }
            let before = active_id(&stack);
            stack.scoped(|_| ());
            assert_eq!(active_id(&stack), before);
        }
        assert_eq!(active_id(&stack), seen[0]);
        drop(g1);
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_scoped_returns_value() {
        let stack = ScopeStack::new();
        let _root = stack.enter_new_child();

        let (depth, kind) = stack.scoped_with_kind(ScopeKind::Function, |scope| {
            (scope.depth(), scope.kind())
        });
        assert_eq!(depth, 1);
        assert_eq!(kind, ScopeKind::Function);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_retained_scope_outlives_exit() {
        let stack = ScopeStack::new();
        let _root = stack.enter_new_child();

        let (kept, handle) = stack.scoped(|scope| (scope.clone(), scope.create_or_get("tmp")));

        // Still owned through `kept`, but no longer reachable from the stack
        assert!(handle.is_alive());
        assert!(stack.lookup("tmp").is_none());
        drop(kept);
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_out_of_order_release_restores_saved_scope() {
        let stack = ScopeStack::new();
        let outer = stack.enter_new_child();
        let outer_id = outer.scope().id();
        let inner = stack.enter_new_child();

        drop(outer);
        assert!(stack.current().is_none());
        drop(inner);
        assert_eq!(active_id(&stack), Some(outer_id));
    }

    #[test]
    fn test_independent_stacks() {
        let a = ScopeStack::new();
        let b = ScopeStack::new();
        let _ga = a.enter_new_child();

        assert!(b.current().is_none());
        a.create_or_get_variable("only_a").unwrap();
        let _gb = b.enter_new_child();
        assert!(b.lookup("only_a").is_none());
    }

    #[test]
    fn test_thread_local_free_functions() {
        assert!(current().is_none());
        {
            let _root = enter_new_child();
            let v = create_or_get_variable("shared").unwrap();
            let _fn_scope = enter_new_child_with_kind(ScopeKind::Function);
            assert_eq!(lookup("shared"), Some(v));
            assert_eq!(current().unwrap().kind(), ScopeKind::Function);
        }
        assert!(current().is_none());
    }

    #[test]
    fn test_threads_are_independent() {
        let _root = enter_new_child();
        create_or_get_variable("main_only").unwrap();

        let seen_from_worker = std::thread::spawn(|| {
            let empty_at_start = current().is_none();
            let _worker_root = enter_new_child();
            create_or_get_variable("worker_only").unwrap();
            (empty_at_start, lookup("main_only").is_none())
        })
        .join()
        .unwrap();

        assert_eq!(seen_from_worker, (true, true));
        assert!(lookup("worker_only").is_none());
        assert!(lookup("main_only").is_some());
    }
}
