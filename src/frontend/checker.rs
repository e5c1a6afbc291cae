use std::fmt;

use crate::frontend::parser::PrecedenceParser;
use crate::frontend::parser_error::ParserError;
use crate::frontend::recursive::RecursiveDescentParser;
use crate::frontend::state_machine::StateMachineParser;
use crate::frontend::token::Token;
use crate::grammar::rules::build_grammar;
use crate::grammar::table::GrammarError;

/// Decides whether a token stream is a well-formed program.
pub trait SyntaxChecker {
    fn check(&self, tokens: &[Token]) -> Result<(), ParserError>;
}

impl SyntaxChecker for PrecedenceParser {
    fn check(&self, tokens: &[Token]) -> Result<(), ParserError> {
        self.check_syntax(tokens).map(|_| ())
    }
}

impl SyntaxChecker for RecursiveDescentParser {
    fn check(&self, tokens: &[Token]) -> Result<(), ParserError> {
        self.check_syntax(tokens)
    }
}

impl SyntaxChecker for StateMachineParser {
    fn check(&self, tokens: &[Token]) -> Result<(), ParserError> {
        self.check_syntax(tokens)
    }
}

/// The available syntax checkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckerKind {
    #[default]
    Precedence,
    Recursive,
    StateMachine,
}

impl CheckerKind {
    pub const ALL: [CheckerKind; 3] = [
        CheckerKind::Precedence,
        CheckerKind::Recursive,
        CheckerKind::StateMachine,
    ];

    pub fn build(self) -> Result<Box<dyn SyntaxChecker>, GrammarError> {
        Ok(match self {
            CheckerKind::Precedence => Box::new(PrecedenceParser::new(build_grammar())?),
            CheckerKind::Recursive => Box::new(RecursiveDescentParser::new()),
            CheckerKind::StateMachine => Box::new(StateMachineParser::new()),
        })
    }
}

impl fmt::Display for CheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckerKind::Precedence => "precedence",
            CheckerKind::Recursive => "recursive descent",
            CheckerKind::StateMachine => "state machine",
        };
        write!(f, "{}", name)
    }
}
