//! Parser for method-chain expressions such as
//! `select("order").where("address").is(1234)`.

mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::{CallExpr, ParsedChain};

/// Parse a method-chain expression into a [`ParsedChain`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a valid chain expression.
pub fn parse(input: &str) -> Result<ParsedChain, ParseError> {
    use winnow::Parser;
    grammar::parse_chain.parse(input).map_err(|e| {
        let mut rest = input;
        ParseError::new(grammar::leading_calls(&mut rest), e.to_string())
    })
}
