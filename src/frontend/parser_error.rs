use crate::frontend::token::Token;
use crate::grammar::symbol::Symbol;

/// A syntax-check failure. Every variant carries the 1-based line of the
/// offending token; checking stops at the first one.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("line {line}: unknown token '{token}'")]
    UnknownToken { token: String, line: usize },

    #[error("line {line}: syntax error: '{right}' cannot follow '{left}'")]
    NoRelation {
        left: Symbol,
        right: Symbol,
        line: usize,
    },

    #[error("line {line}: syntax error: no rule reduces '{base}'")]
    NoRule { base: String, line: usize },

    /// Raised by the recursive-descent and state-machine checkers.
    #[error("line {line}: syntax error: expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: String,
        line: usize,
    },
}

impl ParserError {
    /// `expected` was wanted where `found` stands. `None` is the end of the
    /// input, reported on `last_line`.
    pub fn expected(expected: impl ToString, found: Option<&Token>, last_line: usize) -> Self {
        let (found, line) = match found {
            Some(token) => (format!("'{}'", token), token.line),
            None => ("end of input".to_string(), last_line),
        };
        ParserError::Expected {
            expected: expected.to_string(),
            found,
            line,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParserError::UnknownToken { line, .. }
            | ParserError::NoRelation { line, .. }
            | ParserError::NoRule { line, .. }
            | ParserError::Expected { line, .. } => *line,
        }
    }
}
