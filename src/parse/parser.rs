use crate::Value;

/// One `method(args...)` step of a chain expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub method: String,
    pub args: Vec<Value>,
}

/// The result of parsing a chain expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedChain {
    pub calls: Vec<CallExpr>,
}
