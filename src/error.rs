use thiserror::Error;

use crate::parse::ParseError;
use crate::{AuthoringError, CompileError, InvokeError};

/// Unified error type covering authoring, compilation, invocation and parsing.
///
/// Returned by convenience methods like [`Grammar::compile()`](crate::Grammar::compile)
/// and [`Chain::run()`](crate::Chain::run).
#[derive(Debug, Error)]
pub enum FluentError {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
