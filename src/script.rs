//! Scope scripts - replayable sequences of scope operations
//!
//! A script is a TOML document made of `[[step]]` tables:
//!
//! ```toml
//! [[step]]
//! op = "enter"
//!
//! [[step]]
//! op = "create"
//! name = "X"
//!
//! [[step]]
//! op = "fail"
//! message = "boom"
//! caught_at = 1
//! ```
//!
//! `ScriptRunner` replays the steps on its own `ScopeStack`, keeping one guard
//! per open `enter`.

use crate::scope::{ScopeGuard, ScopeId, ScopeKind, ScopeSnapshot, ScopeStack};
use crate::variable::VariableId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One operation in a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    /// Enter a new child of the active scope
    Enter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ScopeKind>,
    },
    /// Leave the most recently entered scope
    Exit,
    /// Create-or-get a variable in the active scope
    Create { name: String },
    /// Look a name up from the active scope
    Lookup { name: String },
    /// Remove a name from the active scope only
    Remove { name: String },
    /// Raise an error that unwinds open scopes until `caught_at` depth.
    /// Uncaught errors end the run.
    Fail {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caught_at: Option<usize>,
    },
}

impl Step {
    pub fn enter() -> Self {
        Step::Enter { kind: None }
    }

    pub fn create(name: impl Into<String>) -> Self {
        Step::Create { name: name.into() }
    }

    pub fn lookup(name: impl Into<String>) -> Self {
        Step::Lookup { name: name.into() }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Step::Remove { name: name.into() }
    }

    pub fn fail(message: impl Into<String>, caught_at: Option<usize>) -> Self {
        Step::Fail {
            message: Some(message.into()),
            caught_at,
        }
    }
}

/// A sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Parse a script from TOML text
    pub fn parse(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a script from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

/// What a single step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StepOutcome {
    Enter {
        scope: ScopeId,
        kind: ScopeKind,
        depth: usize,
    },
    Exit {
        scope: ScopeId,
        restored: Option<ScopeId>,
    },
    Create {
        name: String,
        variable: VariableId,
        owner: ScopeId,
        reused: bool,
    },
    Lookup {
        name: String,
        variable: Option<VariableId>,
        distance: Option<usize>,
    },
    Remove {
        name: String,
        removed: bool,
    },
    Failed {
        message: String,
        caught: bool,
        restored: Option<ScopeId>,
    },
}

/// Result of replaying a script
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub outcomes: Vec<StepOutcome>,
    /// Whether an uncaught `fail` ended the run
    pub aborted: bool,
    /// The active chain once the run ended
    pub final_state: ScopeSnapshot,
}

/// Replays scripts against a private scope stack
#[derive(Debug, Default)]
pub struct ScriptRunner {
    stack: ScopeStack,
    guards: Vec<ScopeGuard>,
    root_kind: Option<ScopeKind>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `kind` for root scopes entered without an explicit kind
    pub fn with_root_kind(mut self, kind: ScopeKind) -> Self {
        self.root_kind = Some(kind);
        self
    }

    pub fn stack(&self) -> &ScopeStack {
        &self.stack
    }

    /// Number of scopes entered and not yet exited
    pub fn open_scopes(&self) -> usize {
        self.guards.len()
    }

    /// Replay `script`, continuing from whatever scopes are still open
    pub fn run(&mut self, script: &Script) -> Result<ScriptReport> {
        let mut outcomes = Vec::with_capacity(script.steps.len());
        let mut aborted = false;

        for (index, step) in script.steps.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", index, step);
            let outcome = self.apply(step)?;
            let stop = matches!(outcome, StepOutcome::Failed { caught: false, .. });
            outcomes.push(outcome);
            if stop {
                aborted = true;
                tracing::info!("Uncaught failure at step {}; stopping", index);
                break;
            }
        }

        let final_state = self
            .stack
            .current()
            .map(|scope| scope.snapshot())
            .unwrap_or_default();

        Ok(ScriptReport {
            outcomes,
            aborted,
            final_state,
        })
    }

    fn apply(&mut self, step: &Step) -> Result<StepOutcome> {
        match step {
            Step::Enter { kind } => {
                let root_kind = self.root_kind.filter(|_| self.stack.current().is_none());
                let guard = match kind.or(root_kind) {
                    Some(kind) => self.stack.enter_new_child_with_kind(kind),
                    None => self.stack.enter_new_child(),
                };
                let outcome = StepOutcome::Enter {
                    scope: guard.scope().id(),
                    kind: guard.scope().kind(),
                    depth: guard.scope().depth(),
                };
                self.guards.push(guard);
                Ok(outcome)
            }
            Step::Exit => {
                let guard = self
                    .guards
                    .pop()
                    .ok_or_else(|| Error::Script("exit without a matching enter".to_string()))?;
                let scope = guard.scope().id();
                drop(guard);
                Ok(StepOutcome::Exit {
                    scope,
                    restored: self.active_id(),
                })
            }
            Step::Create { name } => {
                let active = self.stack.current().ok_or(Error::NoActiveScope)?;
                let existing = active.resolve(name);
                let reused = existing.is_some();
                let owner = existing
                    .map(|resolution| resolution.owner())
                    .unwrap_or_else(|| active.id());
                let handle = active.create_or_get(name);
                let variable = handle.id().ok_or_else(|| {
                    Error::Script(format!("variable '{}' vanished after creation", name))
                })?;
                Ok(StepOutcome::Create {
                    name: name.clone(),
                    variable,
                    owner,
                    reused,
                })
            }
            Step::Lookup { name } => {
                let resolution = self.stack.current().and_then(|scope| scope.resolve(name));
                Ok(StepOutcome::Lookup {
                    name: name.clone(),
                    variable: resolution.as_ref().and_then(|r| r.handle.id()),
                    distance: resolution.map(|r| r.distance),
                })
            }
            Step::Remove { name } => {
                let active = self.stack.current().ok_or(Error::NoActiveScope)?;
                Ok(StepOutcome::Remove {
                    name: name.clone(),
                    removed: active.remove(name),
                })
            }
            Step::Fail { message, caught_at } => {
                let open = self.guards.len();
                if let Some(depth) = caught_at {
                    if *depth >= open {
                        return Err(Error::Script(format!(
                            "fail caught at depth {} but only {} scope(s) are open",
                            depth, open
                        )));
                    }
                }
                let target = caught_at.unwrap_or(0);
                while self.guards.len() > target {
                    self.unwind_one();
                }
                Ok(StepOutcome::Failed {
                    message: message.clone().unwrap_or_else(|| "failure".to_string()),
                    caught: target > 0,
                    restored: self.active_id(),
                })
            }
        }
    }

    fn unwind_one(&mut self) {
        if let Some(guard) = self.guards.pop() {
            tracing::debug!("Unwinding {}", guard.scope().id());
        }
    }

    fn active_id(&self) -> Option<ScopeId> {
        self.stack.current().map(|scope| scope.id())
    }
}

impl Drop for ScriptRunner {
    fn drop(&mut self) {
        // Vec drops front to back; guards must go innermost first
        while !self.guards.is_empty() {
            self.unwind_one();
        }
    }
}

/// Built-in demonstration scripts, by name
pub fn demo_scripts() -> Vec<(&'static str, Script)> {
    vec![
        (
            "isolation",
            Script::new(vec![
                Step::enter(),
                Step::create("X"),
                Step::create("Y"),
                Step::enter(),
                Step::create("TMP"),
                Step::Exit,
                Step::lookup("TMP"),
                Step::lookup("X"),
            ]),
        ),
        (
            "ancestor-reuse",
            Script::new(vec![
                Step::enter(),
                Step::create("A"),
                Step::enter(),
                Step::lookup("A"),
                Step::create("A"),
            ]),
        ),
        (
            "restore-on-error",
            Script::new(vec![
                Step::enter(),
                Step::enter(),
                Step::create("inner"),
                Step::fail("raised inside child", Some(1)),
                Step::lookup("inner"),
            ]),
        ),
    ]
}
