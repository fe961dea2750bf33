//! # Scopechain - Hierarchical variable scopes
//!
//! Scopechain provides:
//! - Scopes that own their variables and share ownership of their parent
//! - Lookup that walks from a scope up to the root, nearest scope first
//! - Weak variable handles that report absence once their scope is gone
//! - A per-thread active-scope stack with guards that restore on every exit
//! - A small script format for replaying scope operations

pub mod variable;
pub mod scope;
pub mod script;
pub mod ui;
pub mod output;
pub mod config;


// Re-exports for convenient access
pub use variable::{VarHandle, Variable, VariableId};
pub use scope::{Scope, ScopeGuard, ScopeId, ScopeKind, ScopeStack};
pub use script::{Script, ScriptRunner};

/// Result type alias for Scopechain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Scopechain operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No active scope on this stack")]
    NoActiveScope,

    #[error("Unknown scope kind: {0}")]
    UnknownScopeKind(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
