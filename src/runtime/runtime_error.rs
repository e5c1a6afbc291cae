#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime error: stack underflow at op {ip} ({op})")]
    StackUnderflow { ip: usize, op: String },

    /// An identifier that was never registered in the store.
    #[error("runtime error: undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("runtime error: jump to undefined label '{name}'")]
    UndefinedLabel { name: String },

    #[error("runtime error: {op} expects {expected}, got {got}")]
    TypeMismatch {
        op: String,
        expected: &'static str,
        got: String,
    },

    /// A `Read` that could not produce a number.
    #[error("runtime error: invalid input for '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    /// A pool slot the program does not define.
    #[error("runtime error: malformed program: {reason}")]
    InvalidProgram { reason: String },

    #[error("runtime error: execution step limit exceeded ({0})")]
    StepLimit(usize),

    #[error("runtime error: i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub fn stack_underflow(ip: usize, op: impl ToString) -> RuntimeError {
    RuntimeError::StackUnderflow {
        ip,
        op: op.to_string(),
    }
}

pub fn type_mismatch(op: impl ToString, expected: &'static str, got: impl ToString) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op: op.to_string(),
        expected,
        got: got.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = RuntimeError::InvalidInput {
            name: "a".to_string(),
            reason: "'x' is not a number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid input"));
        assert!(msg.contains("'a'"));
    }

    #[test]
    fn test_helpers() {
        let err = stack_underflow(3, "+");
        assert_eq!(err.to_string(), "runtime error: stack underflow at op 3 (+)");

        let err = type_mismatch("=", "identifier", "5");
        assert_eq!(err.to_string(), "runtime error: = expects identifier, got 5");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::other("pipe closed");
        let err: RuntimeError = io.into();
        assert!(matches!(err, RuntimeError::Io(_)));
    }
}
