mod builder_node;
mod chain;
mod error;
mod grammar;
mod hooks;
mod options;
mod rule;
mod segment;
mod value;

pub use builder_node::{BuilderNode, BuilderTree, NodeId, NodeKind, Param};
pub use chain::{Chain, Fluent};
pub use error::{AuthoringError, CompileError, HookError, InvokeError};
pub use grammar::{Cursor, CursorKind, Grammar};
pub use hooks::{Call, Hooks, Invocation, Transcript};
pub use options::{CompileOptions, DEFAULT_MAX_DEPTH};
pub use rule::{Definition, Rule};
pub use segment::{Repeat, Segment};
pub use value::Value;
