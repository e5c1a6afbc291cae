use std::collections::HashMap;

use crate::frontend::token::{NEWLINE, Token, TokenKind};
use crate::postfix::{Op, Program, compose_error::ComposeError};
use crate::runtime::store::VariableStore;

/// Binding strength of an operator or structural keyword.
fn priority(text: &str) -> Option<u8> {
    let p = match text {
        "(" | "[" | "if" | "do" | "readl" | "writel" | NEWLINE => 0,
        "to" | "next" | ")" | "]" | "then" => 1,
        "=" => 2,
        "or" => 3,
        "and" => 4,
        "!" => 5,
        "<" | "<=" | ">" | ">=" | "==" | "!=" => 6,
        "+" | "-" => 7,
        "*" | "/" | "@" => 8,
        _ => return None,
    };
    Some(p)
}

/// An entry of the operator stack. `id` keys the construct side table.
#[derive(Debug, Clone)]
struct Pending {
    text: String,
    line: usize,
    id: usize,
}

#[derive(Debug, Clone, Default)]
struct LoopContext {
    parameter: Option<String>,
    bound: Option<String>,
    entry: Option<String>,
    exit: Option<String>,
}

#[derive(Debug, Clone)]
enum Context {
    If { label: String },
    Loop(LoopContext),
}

/// Translates a statement body into postfix by priority climbing, and
/// linearizes `if`, `do`, `readl` and `writel` into labels and jumps.
pub struct Composer<'a> {
    /// Label names handed out so far; new labels are appended.
    labels: &'a mut Vec<String>,
    /// Receives the synthesized loop-bound variables.
    store: &'a mut VariableStore,

    out: Program,
    stack: Vec<Pending>,
    contexts: HashMap<usize, Context>,
    next_id: usize,
}

/// Composes the body between `begin` and `end` of `tokens`.
pub fn compose(
    tokens: &[Token],
    labels: &mut Vec<String>,
    store: &mut VariableStore,
) -> Result<Program, ComposeError> {
    Composer::new(labels, store).compose(tokens)
}

/// Composes a bare expression or statement line, without the program
/// frame around it.
pub fn compose_expression(
    tokens: &[Token],
    labels: &mut Vec<String>,
    store: &mut VariableStore,
) -> Result<Program, ComposeError> {
    Composer::new(labels, store).compose_expression(tokens)
}

impl<'a> Composer<'a> {
    pub fn new(labels: &'a mut Vec<String>, store: &'a mut VariableStore) -> Self {
        Self {
            labels,
            store,
            out: Program::new(),
            stack: Vec::new(),
            contexts: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn compose(self, tokens: &[Token]) -> Result<Program, ComposeError> {
        let body = body(tokens)?;
        self.compose_expression(body)
    }

    /// Composes `tokens` as they are, with no `begin`/`end` lookup.
    pub fn compose_expression(mut self, tokens: &[Token]) -> Result<Program, ComposeError> {
        let mut prev: Option<&Token> = None;
        for token in tokens {
            self.feed(token, prev)?;
            prev = Some(token);
        }

        // the last line may end at `end` without a break
        if let Some(last) = prev.filter(|t| !t.is_newline()) {
            self.feed(&Token::newline(last.line), Some(last))?;
        }

        if let Some(open) = self.stack.pop() {
            return Err(match open.text.as_str() {
                "(" | "[" => ComposeError::Unbalanced {
                    token: open.text,
                    line: open.line,
                },
                _ => ComposeError::Unterminated {
                    construct: open.text,
                    line: open.line,
                },
            });
        }

        log::debug!(
            "composed {} ops ({} constants, {} labels)",
            self.out.len(),
            self.out.constants.len(),
            self.out.labels.len()
        );

        Ok(self.out)
    }

    fn feed(&mut self, token: &Token, prev: Option<&Token>) -> Result<(), ComposeError> {
        match &token.kind {
            TokenKind::Identifier(name) => self.out.push_ident(name),
            TokenKind::Constant(value) => self.out.push_constant(*value),
            TokenKind::Label(name) => self.out.push_label(name),
            TokenKind::Keyword(text) if text == ":" => self.out.push(Op::Mark),
            TokenKind::Keyword(text) => self.keyword(text, token, prev)?,
            TokenKind::Composite(_) | TokenKind::Nonterminal(_) => {
                return Err(unexpected(token));
            }
        }
        Ok(())
    }

    fn keyword(
        &mut self,
        text: &str,
        token: &Token,
        prev: Option<&Token>,
    ) -> Result<(), ComposeError> {
        let line = token.line;

        // prefix operators bind directly, nothing is popped for them
        if text == "-" && !follows_operand(prev) {
            self.push_pending("@", line);
            return Ok(());
        }
        if text == "!" {
            self.push_pending(text, line);
            return Ok(());
        }

        if text == ")" || text == "]" {
            return self.close_bracket(text, line);
        }

        if let Some(id) = self.innermost("if") {
            match text {
                "then" => {
                    let label = self.new_label();
                    self.pop_until("if", line)?;
                    self.out.push_label(&label);
                    self.out.push(Op::JumpIfFalse);
                    self.contexts.insert(id, Context::If { label });
                    return Ok(());
                }
                "goto" => return Ok(()),
                NEWLINE => return self.close_if(id, line),
                _ => {}
            }
        }

        if let Some(id) = self.innermost("do") {
            if self.loop_keyword(id, text, line)? {
                return Ok(());
            }
        }

        if let Some(io) = self.open_io() {
            let write = self.stack[io].text == "writel";
            let after_open = prev.is_some_and(|p| p.is_keyword("("));
            match text {
                "," if after_open => return Ok(()),
                "," => {
                    self.out.push(if write { Op::Write } else { Op::Read });
                    return Ok(());
                }
                "(" if prev.is_some_and(|p| p.is_keyword(&self.stack[io].text)) => {
                    return Ok(());
                }
                _ => {}
            }
        }

        if text == NEWLINE {
            return self.flush_line(line);
        }

        if text == "(" || text == "[" {
            self.push_pending(text, line);
            return Ok(());
        }

        let incoming = match priority(text) {
            Some(p) if p != 1 => p,
            _ => return Err(unexpected(token)),
        };

        while let Some(top) = self.stack.last() {
            if top.text == "do" || priority(&top.text).unwrap_or(0) < incoming {
                break;
            }
            self.pop_operator(line)?;
        }

        self.push_pending(text, line);
        Ok(())
    }

    /// `do P = E1 to E2 ... next`. Returns whether the token was consumed.
    fn loop_keyword(&mut self, id: usize, text: &str, line: usize) -> Result<bool, ComposeError> {
        let mut ctx = match self.contexts.remove(&id) {
            Some(Context::Loop(ctx)) => ctx,
            _ => LoopContext::default(),
        };

        let consumed = match text {
            "=" if ctx.parameter.is_none() && self.stack.last().is_some_and(|t| t.id == id) => {
                match self.out.ops.last() {
                    Some(Op::Ident(name)) => ctx.parameter = Some(name.clone()),
                    _ => return Err(ComposeError::MissingLoopParameter { line }),
                }
                // the assignment itself still goes through the operator stack
                false
            }
            "to" => {
                let bound = self.new_bound();
                let entry = self.new_label();
                self.pop_until("do", line)?;
                self.out.push_label(&entry);
                self.out.push(Op::Mark);
                self.out.push_ident(&bound);
                ctx.bound = Some(bound);
                ctx.entry = Some(entry);
                true
            }
            NEWLINE if ctx.exit.is_none() => {
                let (Some(parameter), Some(bound)) = (ctx.parameter.clone(), ctx.bound.clone())
                else {
                    return Err(ComposeError::Unterminated {
                        construct: "do ... to".to_string(),
                        line,
                    });
                };
                let exit = self.new_label();
                self.pop_until("do", line)?;
                // bound = E2; while parameter <= bound
                self.out.push(Op::Assign);
                self.out.push_ident(&parameter);
                self.out.push_ident(&bound);
                self.out.push(Op::Le);
                self.out.push_label(&exit);
                self.out.push(Op::JumpIfFalse);
                ctx.exit = Some(exit);
                true
            }
            NEWLINE => {
                self.pop_until("do", line)?;
                true
            }
            "next" => {
                let (Some(parameter), Some(entry), Some(exit)) =
                    (ctx.parameter.take(), ctx.entry.take(), ctx.exit.take())
                else {
                    return Err(unexpected(&Token::keyword("next", line)));
                };
                self.pop_until("do", line)?;
                self.out.push_ident(&parameter);
                self.out.push_ident(&parameter);
                self.out.push_constant(1.0);
                self.out.push(Op::Add);
                self.out.push(Op::Assign);
                self.out.push_label(&entry);
                self.out.push(Op::Jump);
                self.out.push_label(&exit);
                self.out.push(Op::Mark);
                self.stack.pop();
                log::trace!("closed loop over '{}'", parameter);
                return Ok(true);
            }
            _ => false,
        };

        self.contexts.insert(id, Context::Loop(ctx));
        Ok(consumed)
    }

    fn close_if(&mut self, id: usize, line: usize) -> Result<(), ComposeError> {
        let label = match self.contexts.remove(&id) {
            Some(Context::If { label }) => label,
            _ => {
                return Err(ComposeError::Unterminated {
                    construct: "if ... then".to_string(),
                    line,
                });
            }
        };
        self.pop_until("if", line)?;
        self.out.push(Op::Jump);
        self.out.push_label(&label);
        self.out.push(Op::Mark);
        self.stack.pop();
        Ok(())
    }

    fn close_bracket(&mut self, text: &str, line: usize) -> Result<(), ComposeError> {
        if text == ")" {
            if let Some(io) = self.open_io() {
                let keyword = self.stack[io].text.clone();
                self.out.push(if keyword == "writel" {
                    Op::Write
                } else {
                    Op::Read
                });
                self.pop_until(&keyword, line)?;
                self.stack.pop();
                return Ok(());
            }
        }

        let opener = if text == ")" { "(" } else { "[" };
        self.pop_until(opener, line).map_err(|_| ComposeError::Unbalanced {
            token: text.to_string(),
            line,
        })?;
        self.stack.pop();
        Ok(())
    }

    /// A line break flushes pending operators down to the innermost loop.
    fn flush_line(&mut self, line: usize) -> Result<(), ComposeError> {
        while self.stack.last().is_some_and(|t| t.text != "do") {
            self.pop_operator(line)?;
        }
        Ok(())
    }

    /// Moves operators to the output until `text` is on top.
    fn pop_until(&mut self, text: &str, line: usize) -> Result<(), ComposeError> {
        loop {
            match self.stack.last() {
                Some(top) if top.text == text => return Ok(()),
                Some(_) => self.pop_operator(line)?,
                None => {
                    return Err(ComposeError::Unbalanced {
                        token: text.to_string(),
                        line,
                    });
                }
            }
        }
    }

    fn pop_operator(&mut self, line: usize) -> Result<(), ComposeError> {
        let Some(top) = self.stack.pop() else {
            return Ok(());
        };
        match Op::from_operator(&top.text) {
            Some(op) => {
                self.out.push(op);
                Ok(())
            }
            None => Err(match top.text.as_str() {
                "(" | "[" => ComposeError::Unbalanced {
                    token: top.text,
                    line: top.line,
                },
                _ => ComposeError::Unterminated {
                    construct: top.text,
                    line,
                },
            }),
        }
    }

    fn push_pending(&mut self, text: &str, line: usize) {
        self.next_id += 1;
        self.stack.push(Pending {
            text: text.to_string(),
            line,
            id: self.next_id,
        });
    }

    fn innermost(&self, text: &str) -> Option<usize> {
        self.stack.iter().rev().find(|t| t.text == text).map(|t| t.id)
    }

    /// Stack position of a `readl`/`writel` whose argument list is open,
    /// i.e. with no bracket pushed above it.
    fn open_io(&self) -> Option<usize> {
        let pos = self
            .stack
            .iter()
            .rposition(|t| t.text == "readl" || t.text == "writel")?;
        let nested = self.stack[pos + 1..].iter().any(|t| t.text == "(");
        (!nested).then_some(pos)
    }

    fn new_label(&mut self) -> String {
        let mut n = self.labels.len() + 1;
        while self.labels.iter().any(|l| *l == format!("_m{}", n)) {
            n += 1;
        }
        let label = format!("_m{}", n);
        self.labels.push(label.clone());
        label
    }

    fn new_bound(&mut self) -> String {
        let mut n = self.store.len() + 1;
        while self.store.contains(&format!("_r{}", n)) {
            n += 1;
        }
        let name = format!("_r{}", n);
        self.store.set(&name, 0.0);
        name
    }
}

/// Tokens strictly between the first `begin` and the following `end`.
fn body(tokens: &[Token]) -> Result<&[Token], ComposeError> {
    let begin = tokens
        .iter()
        .position(|t| t.is_keyword("begin"))
        .ok_or(ComposeError::MissingBody)?;
    let end = tokens[begin + 1..]
        .iter()
        .position(|t| t.is_keyword("end"))
        .ok_or(ComposeError::MissingBody)?;
    Ok(&tokens[begin + 1..begin + 1 + end])
}

/// Whether a `-` after `prev` is binary.
fn follows_operand(prev: Option<&Token>) -> bool {
    prev.is_some_and(|p| p.is_operand() || p.is_keyword(")") || p.is_keyword("]"))
}

fn unexpected(token: &Token) -> ComposeError {
    ComposeError::UnexpectedToken {
        token: token.to_string(),
        line: token.line,
    }
}
