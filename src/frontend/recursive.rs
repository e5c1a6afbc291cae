//! Recursive-descent syntax checker for the same language the precedence
//! grammar describes. Each rule is a function from a cursor to
//! `Result<Sequence, NoMatch>`; rules chain with `?` and combine through
//! [`Sequence::repeat`], [`Sequence::maybe`] and [`Sequence::any_of`].

use std::fmt;

use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{NEWLINE, Token, TokenKind};
use crate::grammar::rules::RELATIONAL_OPERATORS;

/// What a failed match was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Keyword(&'static str),
    /// A token class or a whole construct, e.g. `identifier` or `statement`.
    Class(&'static str),
    EndOfInput,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Keyword(text) if *text == NEWLINE => write!(f, "line break"),
            Expected::Keyword(text) => write!(f, "'{}'", text),
            Expected::Class(name) => write!(f, "{}", name),
            Expected::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// A failed match at token position `pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMatch {
    pub expected: Expected,
    pub pos: usize,
}

impl NoMatch {
    /// The failure that got further into the input. Ties keep `self`.
    fn deeper(self, other: Option<NoMatch>) -> NoMatch {
        match other {
            Some(other) if other.pos > self.pos => other,
            _ => self,
        }
    }
}

/// Cursor over the token stream.
#[derive(Debug, Clone, Copy)]
pub struct Sequence<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Deepest failure of an abandoned branch. Reported instead of a later
    /// failure that did not get as far.
    furthest: Option<NoMatch>,
}

pub type Parse<'a> = Result<Sequence<'a>, NoMatch>;

/// A grammar rule: matches a prefix of the input at the cursor.
pub type Rule<'a> = fn(Sequence<'a>) -> Parse<'a>;

impl<'a> Sequence<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Sequence {
            tokens,
            pos: 0,
            furthest: None,
        }
    }

    /// Number of tokens matched so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn fail(&self, expected: Expected) -> NoMatch {
        NoMatch {
            expected,
            pos: self.pos,
        }
        .deeper(self.furthest)
    }

    fn note(mut self, failure: NoMatch) -> Self {
        self.furthest = Some(failure.deeper(self.furthest));
        self
    }

    /// Consumes one token accepted by `accept`.
    fn token(self, expected: Expected, accept: impl Fn(&Token) -> bool) -> Parse<'a> {
        match self.tokens.get(self.pos) {
            Some(token) if accept(token) => {
                log::trace!("matched {} at {}", token, self.pos);
                Ok(Sequence {
                    pos: self.pos + 1,
                    ..self
                })
            }
            _ => Err(self.fail(expected)),
        }
    }

    pub fn keyword(self, text: &'static str) -> Parse<'a> {
        self.token(Expected::Keyword(text), |t| t.is_keyword(text))
    }

    /// Any one of `texts`, reported as `expected` on failure.
    pub fn keyword_of(self, texts: &'static [&'static str], expected: &'static str) -> Parse<'a> {
        self.token(Expected::Class(expected), |t| {
            texts.iter().any(|text| t.is_keyword(text))
        })
    }

    pub fn newline(self) -> Parse<'a> {
        self.keyword(NEWLINE)
    }

    pub fn id(self) -> Parse<'a> {
        self.token(Expected::Class("identifier"), |t| {
            matches!(t.kind, TokenKind::Identifier(_))
        })
    }

    pub fn constant(self) -> Parse<'a> {
        self.token(Expected::Class("constant"), |t| {
            matches!(t.kind, TokenKind::Constant(_))
        })
    }

    pub fn label(self) -> Parse<'a> {
        self.token(Expected::Class("label"), |t| {
            matches!(t.kind, TokenKind::Label(_))
        })
    }

    /// Succeeds only when every token has been consumed.
    pub fn end(self) -> Parse<'a> {
        if self.pos >= self.tokens.len() {
            Ok(self)
        } else {
            Err(self.fail(Expected::EndOfInput))
        }
    }

    pub fn then(self, rule: Rule<'a>) -> Parse<'a> {
        rule(self)
    }

    /// Zero or one match of `rule`.
    pub fn maybe(self, rule: impl Fn(Self) -> Parse<'a>) -> Parse<'a> {
        Ok(rule(self).unwrap_or_else(|failure| self.note(failure)))
    }

    /// Zero or more matches of `rule`. Stops at the first failure or at a
    /// match that consumed nothing.
    pub fn repeat(self, rule: impl Fn(Self) -> Parse<'a>) -> Parse<'a> {
        let mut seq = self;
        loop {
            match rule(seq) {
                Ok(next) if next.pos > seq.pos => seq = next,
                Ok(_) => return Ok(seq),
                Err(failure) => return Ok(seq.note(failure)),
            }
        }
    }

    /// The first alternative that matches. When none gets past the cursor
    /// the failure names `expected` instead of the last alternative tried.
    pub fn any_of(self, expected: &'static str, alternatives: &[Rule<'a>]) -> Parse<'a> {
        let mut deepest: Option<NoMatch> = None;
        for alternative in alternatives {
            match alternative(self) {
                Ok(next) => {
                    return Ok(match deepest {
                        Some(failure) => next.note(failure),
                        None => next,
                    });
                }
                Err(failure) => deepest = Some(failure.deeper(deepest)),
            }
        }
        match deepest {
            Some(failure) if failure.pos > self.pos => Err(failure),
            _ => Err(self.fail(Expected::Class(expected))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveDescentParser;

impl RecursiveDescentParser {
    pub fn new() -> Self {
        RecursiveDescentParser
    }

    pub fn check_syntax(&self, tokens: &[Token]) -> Result<(), ParserError> {
        match program(Sequence::new(tokens)) {
            Ok(seq) => {
                log::debug!("recursive descent matched {} tokens", seq.pos());
                Ok(())
            }
            Err(failure) => {
                let last_line = tokens.last().map(|t| t.line).unwrap_or(1);
                Err(ParserError::expected(
                    failure.expected,
                    tokens.get(failure.pos),
                    last_line,
                ))
            }
        }
    }
}

// ============================================================
// Program frame
// ============================================================

fn program<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("program")?
        .id()?
        .newline()?
        .keyword("var")?
        .then(definitions)?
        .newline()?
        .keyword("begin")?
        .then(statements)?
        .keyword("end")?
        .end()
}

/// `Def (; Def)*`
fn definitions<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(definition)?
        .repeat(|s| s.keyword(";")?.then(definition))
}

fn definition<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(id_list)?.keyword(":")?.keyword("float")
}

/// `(, id)+`
fn id_list<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword(",")?
        .id()?
        .repeat(|s| s.keyword(",")?.id())
}

// ============================================================
// Statements
// ============================================================

/// `NL Statement (NL Statement)* NL`
fn statements<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.newline()?
        .then(statement)?
        .repeat(|s| s.newline()?.then(statement))?
        .newline()
}

fn statement<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.any_of("statement", &[labeled as Rule<'a>, unlabeled as Rule<'a>])
}

fn labeled<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.label()?.keyword(":")?.then(unlabeled)
}

fn unlabeled<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.any_of(
        "statement",
        &[assignment as Rule<'a>, read as Rule<'a>, write as Rule<'a>, counted_loop as Rule<'a>, conditional as Rule<'a>],
    )
}

fn assignment<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.id()?.keyword("=")?.then(expression)
}

fn read<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("readl")?
        .keyword("(")?
        .then(id_list)?
        .keyword(")")
}

fn write<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("writel")?
        .keyword("(")?
        .then(id_list)?
        .keyword(")")
}

fn counted_loop<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("do")?
        .id()?
        .keyword("=")?
        .then(expression)?
        .keyword("to")?
        .then(expression)?
        .then(statements)?
        .keyword("next")
}

fn conditional<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("if")?
        .then(condition)?
        .keyword("then")?
        .keyword("goto")?
        .label()
}

// ============================================================
// Conditions
// ============================================================

fn condition<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(conjunction)?
        .repeat(|s| s.keyword("or")?.then(conjunction))
}

fn conjunction<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(logical_factor)?
        .repeat(|s| s.keyword("and")?.then(logical_factor))
}

fn logical_factor<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.any_of("condition", &[bracketed as Rule<'a>, negated as Rule<'a>, relation as Rule<'a>])
}

fn bracketed<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("[")?.then(condition)?.keyword("]")
}

fn negated<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("!")?.then(logical_factor)
}

fn relation<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(expression)?
        .keyword_of(&RELATIONAL_OPERATORS, "relational operator")?
        .then(expression)
}

// ============================================================
// Arithmetic
// ============================================================

/// Unary minus is allowed only in front of the first term.
fn expression<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.maybe(|s| s.keyword("-"))?
        .then(term)?
        .repeat(|s| s.keyword_of(&["+", "-"], "'+' or '-'")?.then(term))
}

fn term<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.then(factor)?
        .repeat(|s| s.keyword_of(&["*", "/"], "'*' or '/'")?.then(factor))
}

fn factor<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.any_of("operand", &[Sequence::id as Rule<'a>, Sequence::constant as Rule<'a>, parenthesized as Rule<'a>])
}

fn parenthesized<'a>(s: Sequence<'a>) -> Parse<'a> {
    s.keyword("(")?.then(expression)?.keyword(")")
}
