use std::fmt;
use std::io::{BufRead, Write};

use crate::postfix::{Op, Program};
use crate::runtime::runtime_error::{RuntimeError, stack_underflow, type_mismatch};
use crate::runtime::store::VariableStore;

#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Abort after this many executed ops. Unlimited by default: a loop
    /// that never exits runs forever.
    pub max_steps: Option<usize>,
}

/// A value on the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Name(String),
    Number(f32),
    Label(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Number(value) => write!(f, "{}", value),
            Operand::Label(slot) => write!(f, "label #{}", slot),
        }
    }
}

/// Stack machine for postfix programs.
pub struct Executor {
    stack: Vec<Operand>,
    config: ExecutorConfig,
    steps: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            stack: Vec::new(),
            config,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[Operand] {
        &self.stack
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Runs `program` against `store`. Returns the value left on top of the
    /// operand stack, if it resolves to a number.
    pub fn execute(
        &mut self,
        program: &Program,
        store: &mut VariableStore,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<f32>, RuntimeError> {
        self.stack.clear();
        self.steps = 0;

        let targets = link(program);
        self.exec_ops(program, &targets, store, input, output)?;

        log::debug!("executed {} ops", self.steps);

        Ok(match self.stack.last() {
            Some(Operand::Number(value)) => Some(*value),
            Some(Operand::Name(name)) => store.get(name),
            _ => None,
        })
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::StepLimit(max));
            }
        }

        Ok(())
    }

    fn exec_ops(
        &mut self,
        program: &Program,
        targets: &[Option<usize>],
        store: &mut VariableStore,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), RuntimeError> {
        let ops = &program.ops;
        let mut ip: usize = 0;

        while ip < ops.len() {
            self.check_limits()?;

            let op = &ops[ip];
            match op {
                Op::Mark => {}

                // `label :` is a jump target, not an operand
                Op::Label(_) if matches!(ops.get(ip + 1), Some(Op::Mark)) => {
                    ip += 2;
                    continue;
                }

                // Operands
                Op::Ident(name) => self.push(Operand::Name(name.clone())),
                Op::Const(slot) => {
                    let value = program
                        .constant(*slot)
                        .ok_or_else(|| RuntimeError::InvalidProgram {
                            reason: format!("constant slot {} is out of range", slot),
                        })?;
                    self.push(Operand::Number(value));
                }
                Op::Label(slot) => self.push(Operand::Label(*slot)),

                // Arithmetic and logic
                Op::Neg => {
                    let a = self.pop_value(ip, op, store)?;
                    self.push(Operand::Number(-a));
                }
                Op::Not => {
                    let a = self.pop_value(ip, op, store)?;
                    self.push(Operand::Number(truth(a <= 0.0)));
                }
                Op::Add
                | Op::Sub
                | Op::Mul
                | Op::Div
                | Op::Eq
                | Op::Ne
                | Op::Lt
                | Op::Gt
                | Op::Le
                | Op::Ge
                | Op::And
                | Op::Or => {
                    let b = self.pop_value(ip, op, store)?;
                    let a = self.pop_value(ip, op, store)?;
                    let value = binary(op, a, b).ok_or_else(|| RuntimeError::InvalidProgram {
                        reason: format!("{} at op {} is not a binary operator", op, ip),
                    })?;
                    self.push(Operand::Number(value));
                }

                Op::Assign => {
                    let value = self.pop_value(ip, op, store)?;
                    let name = self.pop_name(ip, op)?;
                    store.set(&name, value);
                }

                // Jumps
                Op::JumpIfFalse => {
                    let slot = self.pop_label(ip, op)?;
                    let condition = self.pop_value(ip, op, store)?;
                    if condition <= 0.0 {
                        ip = target(program, targets, slot)?;
                        continue;
                    }
                }
                Op::Jump => {
                    let slot = self.pop_label(ip, op)?;
                    ip = target(program, targets, slot)?;
                    continue;
                }

                // I/O
                Op::Read => {
                    let name = self.pop_name(ip, op)?;
                    let value = read_number(input, &name)?;
                    store.set(&name, value);
                }
                Op::Write => {
                    let name = self.pop_name(ip, op)?;
                    let value = lookup(store, &name)?;
                    write!(output, "{} = {}", name, value)?;
                }
            }

            ip += 1;
        }

        Ok(())
    }

    // Stack operations

    fn push(&mut self, operand: Operand) {
        self.stack.push(operand);
    }

    fn pop(&mut self, ip: usize, op: &Op) -> Result<Operand, RuntimeError> {
        self.stack.pop().ok_or_else(|| stack_underflow(ip, op))
    }

    /// Pops an operand and resolves it to a number.
    fn pop_value(&mut self, ip: usize, op: &Op, store: &VariableStore) -> Result<f32, RuntimeError> {
        match self.pop(ip, op)? {
            Operand::Number(value) => Ok(value),
            Operand::Name(name) => lookup(store, &name),
            other => Err(type_mismatch(op, "a number", other)),
        }
    }

    fn pop_name(&mut self, ip: usize, op: &Op) -> Result<String, RuntimeError> {
        match self.pop(ip, op)? {
            Operand::Name(name) => Ok(name),
            other => Err(type_mismatch(op, "an identifier", other)),
        }
    }

    fn pop_label(&mut self, ip: usize, op: &Op) -> Result<usize, RuntimeError> {
        match self.pop(ip, op)? {
            Operand::Label(slot) => Ok(slot),
            other => Err(type_mismatch(op, "a label", other)),
        }
    }
}

/// Jump target of every label slot: the op just past the first
/// `label :` pair.
pub fn link(program: &Program) -> Vec<Option<usize>> {
    let mut targets = vec![None; program.labels.len()];
    for (ip, pair) in program.ops.windows(2).enumerate() {
        if let [Op::Label(slot), Op::Mark] = pair {
            if let Some(target) = targets.get_mut(*slot) {
                if target.is_none() {
                    *target = Some(ip + 2);
                }
            }
        }
    }
    targets
}

fn target(program: &Program, targets: &[Option<usize>], slot: usize) -> Result<usize, RuntimeError> {
    targets
        .get(slot)
        .copied()
        .flatten()
        .ok_or_else(|| RuntimeError::UndefinedLabel {
            name: program
                .label_name(slot)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", slot)),
        })
}

fn lookup(store: &VariableStore, name: &str) -> Result<f32, RuntimeError> {
    store
        .get(name)
        .ok_or_else(|| RuntimeError::UndefinedVariable {
            name: name.to_string(),
        })
}

fn truth(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

/// Applies an arithmetic, relational or logical operator. `None` for any
/// other op.
fn binary(op: &Op, a: f32, b: f32) -> Option<f32> {
    let value = match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Eq => truth(a == b),
        Op::Ne => truth(a != b),
        Op::Lt => truth(a < b),
        Op::Gt => truth(a > b),
        Op::Le => truth(a <= b),
        Op::Ge => truth(a >= b),
        Op::And => truth(a > 0.0 && b > 0.0),
        Op::Or => truth(a > 0.0 || b > 0.0),
        _ => return None,
    };
    Some(value)
}

/// Reads one line and parses it as a number.
fn read_number(input: &mut impl BufRead, name: &str) -> Result<f32, RuntimeError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(RuntimeError::InvalidInput {
            name: name.to_string(),
            reason: "unexpected end of input".to_string(),
        });
    }

    let text = line.trim();
    text.parse::<f32>().map_err(|_| RuntimeError::InvalidInput {
        name: name.to_string(),
        reason: format!("'{}' is not a number", text),
    })
}
