use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// OP - Postfix instructions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // operands
    Ident(String),
    /// Slot in the program's constant pool.
    Const(usize),
    /// Slot in the program's label table.
    Label(usize),
    /// `:` after a label marks a jump target.
    Mark,

    // assignment
    Assign,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    /// Unary minus, written `@`.
    Neg,

    // comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // logic
    And,
    Or,
    Not,

    // ==========================================================================
    // Pseudo-operations, matched structurally by the executor
    // ==========================================================================
    /// ( cond label -- ) jump to label when cond <= 0
    JumpIfFalse,
    /// ( label -- )
    Jump,
    /// ( id -- ) read one number into id
    Read,
    /// ( id -- ) write `id = value`
    Write,
}

impl Op {
    /// Operator named by source text (`@` for unary minus).
    pub fn from_operator(text: &str) -> Option<Op> {
        let op = match text {
            "=" => Op::Assign,
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "@" => Op::Neg,
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::Le,
            ">=" => Op::Ge,
            "and" => Op::And,
            "or" => Op::Or,
            "!" => Op::Not,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Op::Ident(_) | Op::Const(_) | Op::Label(_))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Ident(name) => write!(f, "{}", name),
            Op::Const(slot) => write!(f, "c{}", slot),
            Op::Label(slot) => write!(f, "l{}", slot),
            Op::Mark => write!(f, ":"),
            Op::Assign => write!(f, "="),
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
            Op::Neg => write!(f, "@"),
            Op::Eq => write!(f, "=="),
            Op::Ne => write!(f, "!="),
            Op::Lt => write!(f, "<"),
            Op::Gt => write!(f, ">"),
            Op::Le => write!(f, "<="),
            Op::Ge => write!(f, ">="),
            Op::And => write!(f, "and"),
            Op::Or => write!(f, "or"),
            Op::Not => write!(f, "!"),
            Op::JumpIfFalse => write!(f, "CondFalse"),
            Op::Jump => write!(f, "Uncond"),
            Op::Read => write!(f, "Read"),
            Op::Write => write!(f, "Write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_operator_round_trips_display() {
        for text in [
            "=", "+", "-", "*", "/", "@", "==", "!=", "<", ">", "<=", ">=", "and", "or", "!",
        ] {
            let op = Op::from_operator(text).unwrap();
            assert_eq!(op.to_string(), text);
        }
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(Op::from_operator("("), None);
        assert_eq!(Op::from_operator("then"), None);
    }

    #[test]
    fn test_pseudo_op_names() {
        assert_eq!(Op::JumpIfFalse.to_string(), "CondFalse");
        assert_eq!(Op::Jump.to_string(), "Uncond");
        assert_eq!(Op::Read.to_string(), "Read");
        assert_eq!(Op::Write.to_string(), "Write");
    }
}
