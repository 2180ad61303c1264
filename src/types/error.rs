use thiserror::Error;

use super::grammar::CursorKind;

/// Errors raised by the grammar authoring surface.
///
/// An authoring error aborts only the offending call; the grammar keeps the
/// state it had before that call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthoringError {
    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("'{op}' is not allowed after {cursor}")]
    InvalidSequence { op: &'static str, cursor: CursorKind },

    #[error("another authoring chain is open on this grammar")]
    ConcurrentAuthoring,

    #[error("grammar is frozen; it has already been compiled")]
    Frozen,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("no rules defined; at least one rule is required")]
    NoRuleDefined,

    #[error("no entry point: every rule is referenced by another rule (cycle: {})", cycle.join(" -> "))]
    NoEntryPoint { cycle: Vec<String> },

    #[error("undefined rule reference '{reference}' in rule '{rule}'")]
    UnresolvedReference { rule: String, reference: String },

    #[error("definition {index} of rule '{rule}' is empty")]
    EmptyDefinition { rule: String, index: usize },

    #[error("main rule '{name}' is not defined")]
    UnknownMainRule { name: String },
}

/// Boxed error returned by a caller-supplied [`Hooks`](crate::Hooks) callback.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while invoking methods on a materialized [`Chain`](crate::Chain).
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("method '{method}' is not available here; expected one of [{}]", available.join(", "))]
    UnknownMethod {
        method: String,
        available: Vec<String>,
    },

    #[error("method '{method}' takes {expected} argument(s), got {got}")]
    Arity {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("chain is incomplete; expected one of [{}]", expected.join(", "))]
    Incomplete { expected: Vec<String> },

    #[error("hook failed in method '{method}'")]
    Hook {
        method: String,
        #[source]
        source: HookError,
    },
}
