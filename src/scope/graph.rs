//! Scope chain data structure
//!
//! Each scope tracks:
//! - The variables created directly within it (owned)
//! - A shared reference to its enclosing scope
//! - Its kind, for diagnostics
//!
//! Children share ownership of their parent, so a parent lives as long as
//! any descendant or stack entry still refers to it. Variables are handed
//! out only as weak handles.

use crate::variable::{VarHandle, Variable};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use super::resolver::Resolution;

static NEXT_SCOPE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Module/file level scope
    Module,
    /// Class/struct scope
    Class,
    /// Function/method scope
    Function,
    /// Block scope (if, for, etc.)
    Block,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Module => "module",
            ScopeKind::Class => "class",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
        }
    }

    pub fn all() -> &'static [ScopeKind] {
        &[
            ScopeKind::Module,
            ScopeKind::Class,
            ScopeKind::Function,
            ScopeKind::Block,
        ]
    }
}

impl FromStr for ScopeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "module" | "mod" | "file" | "global" => Ok(ScopeKind::Module),
            "class" | "struct" | "impl" => Ok(ScopeKind::Class),
            "function" | "fn" | "method" => Ok(ScopeKind::Function),
            "block" | "local" => Ok(ScopeKind::Block),
            _ => Err(Error::UnknownScopeKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct ScopeInner {
    id: ScopeId,
    kind: ScopeKind,
    parent: Option<Scope>,
    /// Name → owned variable. Only variables created in this scope.
    variables: RefCell<HashMap<String, Rc<Variable>>>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        tracing::trace!(
            "Dropping {} with {} variable(s)",
            self.id,
            self.variables.borrow().len()
        );

        // Release sole-owned ancestors iteratively so long chains do not
        // recurse once per level.
        let mut parent = self.parent.take();
        while let Some(scope) = parent {
            parent = match Rc::into_inner(scope.inner) {
                Some(mut inner) => inner.parent.take(),
                None => None,
            };
        }
    }
}

/// A node in the scope chain.
///
/// `Scope` is a cheap, reference-counted handle; cloning it shares the same
/// node.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Create a root scope (no parent)
    pub fn root(kind: ScopeKind) -> Self {
        Self::build(kind, None)
    }

    /// Create a new child scope of `parent`
    pub fn child(parent: &Scope, kind: ScopeKind) -> Self {
        Self::build(kind, Some(parent.clone()))
    }

    fn build(kind: ScopeKind, parent: Option<Scope>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                id: ScopeId::next(),
                kind,
                parent,
                variables: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn kind(&self) -> ScopeKind {
        self.inner.kind
    }

    /// Get the parent of this scope
    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Number of ancestors between this scope and the root (root = 0)
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(scope) = current {
            depth += 1;
            current = scope.parent();
        }
        depth
    }

    /// Whether `a` and `b` are the same scope node
    pub fn ptr_eq(a: &Scope, b: &Scope) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Look up a variable in this scope only (not walking parents)
    pub fn lookup_local(&self, name: &str) -> Option<VarHandle> {
        self.inner.variables.borrow().get(name).map(VarHandle::new)
    }

    /// Look up a variable walking up the scope chain
    pub fn lookup(&self, name: &str) -> Option<VarHandle> {
        self.resolve(name).map(|resolution| resolution.handle)
    }

    /// Look up a variable walking up the scope chain, reporting where it was
    /// found
    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        let mut current = Some(self);
        let mut distance = 0;
        while let Some(scope) = current {
            if let Some(handle) = scope.lookup_local(name) {
                tracing::trace!("Resolved '{}' in {} at distance {}", name, scope.id(), distance);
                return Some(Resolution {
                    handle,
                    scope: scope.clone(),
                    distance,
                });
            }
            current = scope.parent();
            distance += 1;
        }
        tracing::trace!("'{}' not found from {}", name, self.id());
        None
    }

    /// Return the variable `name` resolves to, creating it in this scope if
    /// it does not resolve anywhere in the chain.
    ///
    /// An ancestor's variable is reused rather than shadowed.
    pub fn create_or_get(&self, name: &str) -> VarHandle {
        if let Some(existing) = self.lookup(name) {
            return existing;
        }

        let variable = Rc::new(Variable::new(name));
        let handle = VarHandle::new(&variable);
        tracing::debug!("Created {} '{}' in {}", variable.id(), name, self.id());
        self.inner
            .variables
            .borrow_mut()
            .insert(name.to_string(), variable);
        handle
    }

    /// Remove `name` from this scope only. Ancestors are never touched.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.inner.variables.borrow_mut().remove(name);
        if let Some(variable) = &removed {
            tracing::debug!("Removed {} '{}' from {}", variable.id(), name, self.id());
        }
        removed.is_some()
    }

    /// Get all variable names owned by this scope, sorted
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.variables.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.variables.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.variables.borrow().is_empty()
    }

    /// Get scope chain from this scope up to root
    pub fn scope_chain(&self) -> Vec<Scope> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(parent) = current {
            chain.push(parent.clone());
            current = parent.parent();
        }
        chain
    }

    /// Capture the chain from this scope to the root
    pub fn snapshot(&self) -> ScopeSnapshot {
        let chain = self.scope_chain();
        let root_depth = chain.len().saturating_sub(1);
        let frames = chain
            .iter()
            .enumerate()
            .map(|(i, scope)| ScopeFrame {
                id: scope.id(),
                kind: scope.kind(),
                depth: root_depth - i,
                variables: scope.variable_names(),
            })
            .collect();
        ScopeSnapshot { frames }
    }

    #[cfg(test)]
    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("parent", &self.parent().map(|p| p.id()))
            .field("variables", &self.variable_names())
            .finish()
    }
}

/// One scope of a [`ScopeSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFrame {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub depth: usize,
    pub variables: Vec<String>,
}

/// Point-in-time view of a scope chain, innermost scope first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    pub frames: Vec<ScopeFrame>,
}

impl ScopeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of variables across the chain
    pub fn variable_count(&self) -> usize {
        self.frames.iter().map(|f| f.variables.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_hierarchy() {
        let root = Scope::root(ScopeKind::Module);
        let class_scope = Scope::child(&root, ScopeKind::Class);
        let method_scope = Scope::child(&class_scope, ScopeKind::Function);

        assert!(Scope::ptr_eq(method_scope.parent().unwrap(), &class_scope));
        assert!(Scope::ptr_eq(class_scope.parent().unwrap(), &root));
        assert!(root.parent().is_none());
        assert_eq!(method_scope.depth(), 2);
        assert!(root.is_root());
    }

    #[test]
    fn test_definition_lookup() {
        let root = Scope::root(ScopeKind::Module);
        let class_scope = Scope::child(&root, ScopeKind::Class);
        let method_scope = Scope::child(&class_scope, ScopeKind::Function);

        let global = root.create_or_get("global_func");
        let method = class_scope.create_or_get("method");

        // Local lookup
        assert!(class_scope.lookup_local("method").is_some());
        assert!(class_scope.lookup_local("global_func").is_none());

        // Chain lookup from method scope should find both
        assert_eq!(method_scope.lookup("method"), Some(method));
        assert_eq!(method_scope.lookup("global_func"), Some(global));
        assert!(root.lookup("method").is_none());
    }

    #[test]
    fn test_empty_root() {
        let root = Scope::root(ScopeKind::Module);
        assert!(root.lookup("missing").is_none());
        assert!(!root.remove("missing"));
        assert!(root.is_empty());
    }

    #[test]
    fn test_create_or_get_is_idempotent() {
        let root = Scope::root(ScopeKind::Module);
        let first = root.create_or_get("x");
        let second = root.create_or_get("x");

        assert_eq!(first, second);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_create_reuses_ancestor() {
        let root = Scope::root(ScopeKind::Module);
        let outer = root.create_or_get("a");
        let child = Scope::child(&root, ScopeKind::Block);

        let inner = child.create_or_get("a");
        assert_eq!(inner, outer);
        assert!(child.is_empty());
        assert!(child.lookup_local("a").is_none());
    }

    #[test]
    fn test_remove_is_local_only() {
        let root = Scope::root(ScopeKind::Module);
        let outer = root.create_or_get("n");
        let child = Scope::child(&root, ScopeKind::Block);

        // Nothing local to remove; the ancestor's variable is untouched
        assert!(!child.remove("n"));
        assert!(outer.is_alive());
        assert_eq!(child.lookup("n"), Some(outer.clone()));

        assert!(root.remove("n"));
        assert!(!outer.is_alive());
        assert!(child.lookup("n").is_none());
    }

    #[test]
    fn test_removed_name_can_be_recreated() {
        let root = Scope::root(ScopeKind::Module);
        let first = root.create_or_get("v");
        assert!(root.remove("v"));

        let second = root.create_or_get("v");
        assert_ne!(first, second);
        assert!(!first.is_alive());
        assert!(second.is_alive());
    }

    #[test]
    fn test_handles_expire_with_scope() {
        let root = Scope::root(ScopeKind::Module);
        let child = Scope::child(&root, ScopeKind::Block);
        let tmp = child.create_or_get("tmp");

        assert!(tmp.is_alive());
        drop(child);
        assert!(!tmp.is_alive());
        assert_eq!(tmp.name(), None);
    }

    #[test]
    fn test_parent_outlives_child() {
        let root = Scope::root(ScopeKind::Module);
        let kept = root.create_or_get("kept");

        let child = Scope::child(&root, ScopeKind::Block);
        assert_eq!(root.strong_count(), 2);
        drop(child);
        assert_eq!(root.strong_count(), 1);
        assert!(kept.is_alive());

        // A child keeps its parent alive after every other handle is gone
        let child = Scope::child(&root, ScopeKind::Block);
        drop(root);
        assert!(kept.is_alive());
        assert_eq!(child.lookup("kept"), Some(kept.clone()));
        drop(child);
        assert!(!kept.is_alive());
    }

    #[test]
    fn test_deep_chain_drops_without_recursion() {
        let root = Scope::root(ScopeKind::Module);
        let kept = root.create_or_get("kept");

        let mut leaf = Scope::child(&root, ScopeKind::Block);
        for _ in 0..200_000 {
            leaf = Scope::child(&leaf, ScopeKind::Block);
        }
        let deep = leaf.create_or_get("deep");
        assert_eq!(leaf.depth(), 200_001);

        drop(leaf);
        assert!(!deep.is_alive());
        // The shared root is still owned here and must survive
        assert!(kept.is_alive());
        assert_eq!(root.strong_count(), 1);

        let mut leaf = root;
        for _ in 0..200_000 {
            leaf = Scope::child(&leaf, ScopeKind::Block);
        }
        drop(leaf);
        assert!(!kept.is_alive());
    }

    #[test]
    fn test_scope_chain() {
        let s0 = Scope::root(ScopeKind::Module);
        let s1 = Scope::child(&s0, ScopeKind::Class);
        let s2 = Scope::child(&s1, ScopeKind::Function);
        let s3 = Scope::child(&s2, ScopeKind::Block);

        let ids: Vec<ScopeId> = s3.scope_chain().iter().map(Scope::id).collect();
        assert_eq!(ids, vec![s3.id(), s2.id(), s1.id(), s0.id()]);
    }

    #[test]
    fn test_snapshot() {
        let root = Scope::root(ScopeKind::Module);
        root.create_or_get("y");
        root.create_or_get("x");
        let child = Scope::child(&root, ScopeKind::Function);
        child.create_or_get("tmp");

        let snapshot = child.snapshot();
        assert_eq!(snapshot.frames.len(), 2);
        assert_eq!(snapshot.frames[0].depth, 1);
        assert_eq!(snapshot.frames[0].variables, vec!["tmp".to_string()]);
        assert_eq!(snapshot.frames[1].kind, ScopeKind::Module);
        assert_eq!(snapshot.frames[1].variables, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(snapshot.variable_count(), 3);
    }

    #[test]
    fn test_scope_kind_aliases() {
        for kind in ScopeKind::all() {
            let parsed: ScopeKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert_eq!(ScopeKind::from_str("fn").unwrap(), ScopeKind::Function);
        assert!(ScopeKind::from_str("namespace").is_err());
    }
}
