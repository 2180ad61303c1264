use std::fmt;

/// A chain expression that could not be parsed.
///
/// Carries the zero-based index of the call the parser stopped in, so
/// `select(1).where(` reports call 1.
#[derive(Debug)]
pub struct ParseError {
    call: usize,
    message: String,
}

impl ParseError {
    pub(crate) fn new(call: usize, message: impl Into<String>) -> Self {
        Self {
            call,
            message: message.into(),
        }
    }

    /// Index of the first call that did not parse.
    #[must_use]
    pub fn call_index(&self) -> usize {
        self.call
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error in call {}: {}", self.call, self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_the_failing_call() {
        let err = ParseError::new(2, "expected `)`");
        assert_eq!(err.call_index(), 2);
        assert_eq!(err.to_string(), "parse error in call 2: expected `)`");
    }
}
