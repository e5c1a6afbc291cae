#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    /// No `begin` ... `end` pair in the token stream.
    #[error("compose error: program has no begin/end body")]
    MissingBody,

    /// A bracket without its partner.
    #[error("compose error: line {line}: unbalanced '{token}'")]
    Unbalanced { token: String, line: usize },

    /// A token that no rule of the composer accepts in this position.
    #[error("compose error: line {line}: unexpected '{token}'")]
    UnexpectedToken { token: String, line: usize },

    /// A control construct still open at the end of its scope.
    #[error("compose error: line {line}: '{construct}' is not closed")]
    Unterminated { construct: String, line: usize },

    #[error("compose error: line {line}: loop has no parameter before '='")]
    MissingLoopParameter { line: usize },
}

impl ComposeError {
    pub fn line(&self) -> Option<usize> {
        match self {
            ComposeError::MissingBody => None,
            ComposeError::Unbalanced { line, .. }
            | ComposeError::UnexpectedToken { line, .. }
            | ComposeError::Unterminated { line, .. }
            | ComposeError::MissingLoopParameter { line } => Some(*line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ComposeError::Unbalanced {
            token: ")".to_string(),
            line: 3,
        };
        assert_eq!(err.to_string(), "compose error: line 3: unbalanced ')'");
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_missing_body_has_no_line() {
        assert_eq!(ComposeError::MissingBody.line(), None);
    }
}
