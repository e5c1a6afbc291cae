//! Table-driven pushdown checker. Each state has a list of token edges and
//! a fallback for tokens no edge accepts; a return stack lets expressions,
//! conditions and statement lists run as sub-machines.

use std::collections::HashMap;
use std::fmt;

use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{NEWLINE, Token, TokenKind};
use crate::grammar::rules::RELATIONAL_OPERATORS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    // program frame
    Start,
    ProgramName,
    HeaderEnd,
    Var,
    DefStart,
    DefId,
    DefNext,
    DefType,
    DefEnd,
    Begin,
    BodyOpen,
    BodyLine,
    BodyNext,
    Done,

    // statements
    Statement,
    LabelColon,
    Unlabeled,
    AssignEq,
    IoOpen,
    IoComma,
    IoId,
    IoNext,
    LoopVar,
    LoopEq,
    LoopTo,
    LoopBody,
    LoopLine,
    LoopNext,
    IfThen,
    IfGoto,
    IfLabel,

    // arithmetic
    ExprStart,
    Operand,
    CloseParen,
    Operator,

    // conditions
    CondStart,
    Relop,
    CondClose,
    CondNext,
}

/// Token class an edge accepts. `EndOfInput` matches past the last token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Keyword(&'static str),
    Identifier,
    Constant,
    Label,
    EndOfInput,
}

impl Pattern {
    pub fn matches(&self, token: Option<&Token>) -> bool {
        match (self, token) {
            (Pattern::EndOfInput, None) => true,
            (_, None) => false,
            (Pattern::Keyword(text), Some(t)) => t.is_keyword(text),
            (Pattern::Identifier, Some(t)) => matches!(t.kind, TokenKind::Identifier(_)),
            (Pattern::Constant, Some(t)) => matches!(t.kind, TokenKind::Constant(_)),
            (Pattern::Label, Some(t)) => matches!(t.kind, TokenKind::Label(_)),
            (Pattern::EndOfInput, Some(_)) => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Keyword(text) if *text == NEWLINE => write!(f, "line break"),
            Pattern::Keyword(text) => write!(f, "'{}'", text),
            Pattern::Identifier => write!(f, "identifier"),
            Pattern::Constant => write!(f, "constant"),
            Pattern::Label => write!(f, "label"),
            Pattern::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// What a matching edge does. The token is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Goto(State),
    /// Remember `ret` and run the sub-machine starting at `sub`.
    Call { sub: State, ret: State },
    /// Resume the caller.
    Return,
}

/// What happens when no edge matches. Everything but `Fail` keeps the
/// token and fires it again in the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Reject the token. `None` lists the edges as the expectation.
    Fail(Option<&'static str>),
    Enter { sub: State, ret: State },
    Leave,
    Jump(State),
}

#[derive(Debug, Clone)]
struct Row {
    edges: Vec<(Pattern, Action)>,
    fallback: Fallback,
}

impl Row {
    fn expected(&self) -> String {
        let names: Vec<String> = self.edges.iter().map(|(p, _)| p.to_string()).collect();
        names.join(" or ")
    }
}

/// Current state plus the return stack.
#[derive(Debug, Clone)]
struct Machine {
    state: State,
    stack: Vec<State>,
}

impl Machine {
    fn pop(&mut self) -> Option<State> {
        let state = self.stack.pop()?;
        self.state = state;
        Some(state)
    }
}

pub struct StateMachineParser {
    rows: HashMap<State, Row>,
}

impl Default for StateMachineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachineParser {
    pub fn new() -> Self {
        let mut parser = StateMachineParser {
            rows: HashMap::new(),
        };
        parser.program_frame();
        parser.statements();
        parser.arithmetic();
        parser.conditions();
        parser
    }

    pub fn check_syntax(&self, tokens: &[Token]) -> Result<(), ParserError> {
        let mut machine = Machine {
            state: State::Start,
            stack: Vec::new(),
        };
        let last_line = tokens.last().map(|t| t.line).unwrap_or(1);

        for token in tokens.iter().map(Some).chain(std::iter::once(None)) {
            self.fire(&mut machine, token, last_line)?;
        }

        log::debug!("state machine accepted {} tokens", tokens.len());
        Ok(())
    }

    /// Feeds one token, following fallbacks until an edge consumes it.
    fn fire(
        &self,
        machine: &mut Machine,
        token: Option<&Token>,
        last_line: usize,
    ) -> Result<(), ParserError> {
        loop {
            let row = self.rows.get(&machine.state).ok_or_else(|| {
                ParserError::expected(format!("a state for {:?}", machine.state), token, last_line)
            })?;

            if let Some((_, action)) = row.edges.iter().find(|(p, _)| p.matches(token)) {
                log::trace!("{:?} --{:?}--> {:?}", machine.state, token.map(Token::to_string), action);
                match *action {
                    Action::Goto(next) => machine.state = next,
                    Action::Call { sub, ret } => {
                        machine.stack.push(ret);
                        machine.state = sub;
                    }
                    Action::Return => {
                        machine
                            .pop()
                            .ok_or_else(|| ParserError::expected("end of input", token, last_line))?;
                    }
                }
                return Ok(());
            }

            match row.fallback {
                Fallback::Fail(expected) => {
                    let expected = expected.map(str::to_string).unwrap_or_else(|| row.expected());
                    return Err(ParserError::expected(expected, token, last_line));
                }
                Fallback::Enter { sub, ret } => {
                    machine.stack.push(ret);
                    machine.state = sub;
                }
                Fallback::Leave => {
                    machine
                        .pop()
                        .ok_or_else(|| ParserError::expected("end of input", token, last_line))?;
                }
                Fallback::Jump(next) => machine.state = next,
            }
        }
    }

    /// States reachable from the table's edges and fallbacks.
    pub fn states(&self) -> Vec<State> {
        let mut out = vec![State::Start];
        for row in self.rows.values() {
            let targets = row.edges.iter().flat_map(|(_, action)| match *action {
                Action::Goto(s) => vec![s],
                Action::Call { sub, ret } => vec![sub, ret],
                Action::Return => vec![],
            });
            let fallback = match row.fallback {
                Fallback::Enter { sub, ret } => vec![sub, ret],
                Fallback::Jump(s) => vec![s],
                Fallback::Fail(_) | Fallback::Leave => vec![],
            };
            for state in targets.chain(fallback) {
                if !out.contains(&state) {
                    out.push(state);
                }
            }
        }
        out
    }

    pub fn has_state(&self, state: State) -> bool {
        self.rows.contains_key(&state)
    }

    // ============================================================
    // Table construction
    // ============================================================

    fn on(&mut self, state: State, pattern: Pattern, action: Action) -> &mut Self {
        self.rows
            .entry(state)
            .or_insert_with(|| Row {
                edges: Vec::new(),
                fallback: Fallback::Fail(None),
            })
            .edges
            .push((pattern, action));
        self
    }

    fn otherwise(&mut self, state: State, fallback: Fallback) -> &mut Self {
        self.rows
            .entry(state)
            .or_insert_with(|| Row {
                edges: Vec::new(),
                fallback,
            })
            .fallback = fallback;
        self
    }

    fn program_frame(&mut self) {
        use Action::*;
        use Pattern::*;
        use State::*;

        self.on(Start, Keyword("program"), Goto(ProgramName))
            .on(ProgramName, Identifier, Goto(HeaderEnd))
            .on(HeaderEnd, Keyword(NEWLINE), Goto(Var))
            .on(Var, Keyword("var"), Goto(DefStart));

        // ,a,b : float ; ,c : float
        self.on(DefStart, Keyword(","), Goto(DefId))
            .on(DefId, Identifier, Goto(DefNext))
            .on(DefNext, Keyword(","), Goto(DefId))
            .on(DefNext, Keyword(":"), Goto(DefType))
            .on(DefType, Keyword("float"), Goto(DefEnd))
            .on(DefEnd, Keyword(";"), Goto(DefStart))
            .on(DefEnd, Keyword(NEWLINE), Goto(Begin));

        self.on(Begin, Keyword("begin"), Goto(BodyOpen))
            .on(BodyOpen, Keyword(NEWLINE), Call { sub: Statement, ret: BodyLine })
            .on(BodyLine, Keyword(NEWLINE), Goto(BodyNext))
            .on(BodyNext, Keyword("end"), Goto(Done))
            .otherwise(BodyNext, Fallback::Enter { sub: Statement, ret: BodyLine })
            .on(Done, EndOfInput, Goto(Done));
    }

    fn statements(&mut self) {
        use Action::*;
        use Pattern::*;
        use State::*;

        self.on(Statement, Label, Goto(LabelColon))
            .on(LabelColon, Keyword(":"), Goto(Unlabeled));
        for state in [Statement, Unlabeled] {
            self.on(state, Identifier, Goto(AssignEq))
                .on(state, Keyword("readl"), Goto(IoOpen))
                .on(state, Keyword("writel"), Goto(IoOpen))
                .on(state, Keyword("do"), Goto(LoopVar))
                .on(state, Keyword("if"), Call { sub: CondStart, ret: IfThen })
                .otherwise(state, Fallback::Fail(Some("statement")));
        }

        // the expression returns straight to whoever ran the statement
        self.on(AssignEq, Keyword("="), Goto(ExprStart));

        self.on(IoOpen, Keyword("("), Goto(IoComma))
            .on(IoComma, Keyword(","), Goto(IoId))
            .on(IoId, Identifier, Goto(IoNext))
            .on(IoNext, Keyword(","), Goto(IoId))
            .on(IoNext, Keyword(")"), Return);

        self.on(LoopVar, Identifier, Goto(LoopEq))
            .on(LoopEq, Keyword("="), Call { sub: ExprStart, ret: LoopTo })
            .on(LoopTo, Keyword("to"), Call { sub: ExprStart, ret: LoopBody })
            .on(LoopBody, Keyword(NEWLINE), Call { sub: Statement, ret: LoopLine })
            .on(LoopLine, Keyword(NEWLINE), Goto(LoopNext))
            .on(LoopNext, Keyword("next"), Return)
            .otherwise(LoopNext, Fallback::Enter { sub: Statement, ret: LoopLine });

        self.on(IfThen, Keyword("then"), Goto(IfGoto))
            .on(IfGoto, Keyword("goto"), Goto(IfLabel))
            .on(IfLabel, Label, Return);
    }

    fn arithmetic(&mut self) {
        use Action::*;
        use Pattern::*;
        use State::*;

        // unary minus only in front of the first term
        self.on(ExprStart, Keyword("-"), Goto(Operand))
            .otherwise(ExprStart, Fallback::Jump(Operand));

        self.on(Operand, Identifier, Goto(Operator))
            .on(Operand, Constant, Goto(Operator))
            .on(Operand, Keyword("("), Call { sub: ExprStart, ret: CloseParen })
            .otherwise(Operand, Fallback::Fail(Some("operand")));

        self.on(CloseParen, Keyword(")"), Goto(Operator));

        for op in ["+", "-", "*", "/"] {
            self.on(Operator, Keyword(op), Goto(Operand));
        }
        self.otherwise(Operator, Fallback::Leave);
    }

    fn conditions(&mut self) {
        use Action::*;
        use Pattern::*;
        use State::*;

        self.on(CondStart, Keyword("!"), Goto(CondStart))
            .on(CondStart, Keyword("["), Call { sub: CondStart, ret: CondClose })
            .otherwise(CondStart, Fallback::Enter { sub: ExprStart, ret: Relop });

        for op in RELATIONAL_OPERATORS {
            self.on(Relop, Keyword(op), Call { sub: ExprStart, ret: CondNext });
        }
        self.otherwise(Relop, Fallback::Fail(Some("relational operator")));

        self.on(CondClose, Keyword("]"), Goto(CondNext));

        self.on(CondNext, Keyword("and"), Goto(CondStart))
            .on(CondNext, Keyword("or"), Goto(CondStart))
            .otherwise(CondNext, Fallback::Leave);
    }
}
