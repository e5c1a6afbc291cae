use std::fmt;

use crate::frontend::token::{NEWLINE, Token, TokenKind};

/// Token class a terminal grammar symbol stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    Identifier,
    Constant,
    Label,
    /// A keyword, operator or the line break, matched by text.
    Keyword(&'static str),
}

/// A position in a grammar production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(&'static str),
    /// The `#` end marker bracketing every parse.
    End,
}

impl Symbol {
    pub const fn keyword(text: &'static str) -> Self {
        Symbol::Terminal(Terminal::Keyword(text))
    }

    pub const fn nonterminal(name: &'static str) -> Self {
        Symbol::Nonterminal(name)
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    /// Recognizer used to classify concrete input tokens.
    pub fn recognizes(&self, token: &Token) -> bool {
        match (self, &token.kind) {
            (Symbol::Terminal(Terminal::Identifier), TokenKind::Identifier(_)) => true,
            (Symbol::Terminal(Terminal::Constant), TokenKind::Constant(_)) => true,
            (Symbol::Terminal(Terminal::Label), TokenKind::Label(_)) => true,
            (Symbol::Terminal(Terminal::Keyword(expected)), TokenKind::Keyword(text)) => {
                expected == text
            }
            _ => false,
        }
    }

    /// The symbol as a token, for rendering productions.
    pub fn to_token(&self) -> Token {
        match self {
            Symbol::Terminal(Terminal::Keyword(text)) => Token::keyword(*text, 0),
            other => Token::nonterminal(other.to_string()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(Terminal::Identifier) => write!(f, "id"),
            Symbol::Terminal(Terminal::Constant) => write!(f, "const"),
            Symbol::Terminal(Terminal::Label) => write!(f, "label"),
            Symbol::Terminal(Terminal::Keyword(text)) if *text == NEWLINE => write!(f, "NL"),
            Symbol::Terminal(Terminal::Keyword(text)) => write!(f, "{}", text),
            Symbol::Nonterminal(name) => write!(f, "{}", name),
            Symbol::End => write!(f, "#"),
        }
    }
}
