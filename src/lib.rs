//! Compile a declarative grammar into a chainable fluent API.
//!
//! A [`Grammar`] is authored rule by rule through a [`Cursor`], compiled once
//! into a [`BuilderTree`], and materialized as a [`Fluent`] whose
//! [`Chain`]s expose exactly the methods the grammar permits at each step.
//!
//! ```
//! use fluent_grammar::Grammar;
//!
//! # fn main() -> Result<(), fluent_grammar::FluentError> {
//! let grammar = Grammar::new();
//! grammar
//!     .rule("e")?
//!     .sym("is")?
//!     .or()?
//!     .sym("isNot")?
//!     .or()?
//!     .sym("contains")?
//!     .end()?;
//!
//! let fluent = grammar.compile()?;
//! assert_eq!(fluent.start().methods(), vec!["is", "isNot", "contains"]);
//! # Ok(())
//! # }
//! ```

mod compile;
mod error;
mod materialize;
pub mod parse;
mod resolve;
mod types;

pub use error::FluentError;
pub use types::{
    AuthoringError, BuilderNode, BuilderTree, Call, Chain, CompileError, CompileOptions, Cursor,
    CursorKind, Definition, Fluent, Grammar, HookError, Hooks, Invocation, InvokeError, NodeId,
    NodeKind, Param, Repeat, Rule, Segment, Transcript, Value, DEFAULT_MAX_DEPTH,
};
