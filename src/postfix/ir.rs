use crate::frontend::token::CONST_EPSILON;
use crate::postfix::Op;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiled postfix program.
///
/// Constants and labels are interned: `Op::Const(i)` refers to
/// `constants[i]` and `Op::Label(i)` to `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub ops: Vec<Op>,
    pub constants: Vec<f32>,
    pub labels: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn push_ident(&mut self, name: &str) {
        self.ops.push(Op::Ident(name.to_string()));
    }

    pub fn push_constant(&mut self, value: f32) {
        let slot = self.intern_constant(value);
        self.ops.push(Op::Const(slot));
    }

    pub fn push_label(&mut self, name: &str) {
        let slot = self.intern_label(name);
        self.ops.push(Op::Label(slot));
    }

    /// Slot of `value`, reusing any constant within `CONST_EPSILON`.
    pub fn intern_constant(&mut self, value: f32) -> usize {
        match self
            .constants
            .iter()
            .position(|c| (c - value).abs() < CONST_EPSILON)
        {
            Some(slot) => slot,
            None => {
                self.constants.push(value);
                self.constants.len() - 1
            }
        }
    }

    pub fn intern_label(&mut self, name: &str) -> usize {
        match self.labels.iter().position(|l| l == name) {
            Some(slot) => slot,
            None => {
                self.labels.push(name.to_string());
                self.labels.len() - 1
            }
        }
    }

    pub fn constant(&self, slot: usize) -> Option<f32> {
        self.constants.get(slot).copied()
    }

    pub fn label_name(&self, slot: usize) -> Option<&str> {
        self.labels.get(slot).map(String::as_str)
    }

    /// Distinct identifier names, in order of first use.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for op in &self.ops {
            if let Op::Ident(name) = op {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Source-like text of one op, with pool slots resolved.
    pub fn render_op(&self, op: &Op) -> String {
        match op {
            Op::Const(slot) => match self.constant(*slot) {
                Some(value) => value.to_string(),
                None => op.to_string(),
            },
            Op::Label(slot) => match self.label_name(*slot) {
                Some(name) => name.to_string(),
                None => op.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Rendered ops, one string per op.
    pub fn texts(&self) -> Vec<String> {
        self.ops.iter().map(|op| self.render_op(op)).collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.texts().join(" "))
    }
}
