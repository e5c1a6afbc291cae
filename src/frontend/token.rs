use std::fmt;

/// Two constants closer than this are the same constant.
pub const CONST_EPSILON: f32 = 1e-5;

/// Text of the line-break token.
pub const NEWLINE: &str = "\n";

/// Reserved words of the language.
pub const KEYWORDS: &[&str] = &[
    "program", "var", "float", "begin", "end", "readl", "writel", "do", "to", "next", "if",
    "then", "goto", "and", "or",
];

#[derive(Debug, Clone)]
pub enum TokenKind {
    Identifier(String),
    Constant(f32),
    Label(String),
    /// Keywords, operators, punctuation and the line break.
    Keyword(String),
    /// Right-hand side of a grammar production.
    Composite(Vec<Token>),
    /// Grammar nonterminal, never produced by the lexer.
    Nonterminal(String),
}

/// A classified source token.
///
/// `line` is 1-based. `index` is the stable per-program slot of an
/// identifier, constant or label (repeated occurrences share it).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub index: Option<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Token {
            kind,
            line,
            index: None,
        }
    }

    pub fn identifier(name: impl Into<String>, line: usize) -> Self {
        Token::new(TokenKind::Identifier(name.into()), line)
    }

    pub fn constant(value: f32, line: usize) -> Self {
        Token::new(TokenKind::Constant(value), line)
    }

    pub fn label(name: impl Into<String>, line: usize) -> Self {
        Token::new(TokenKind::Label(name.into()), line)
    }

    pub fn keyword(text: impl Into<String>, line: usize) -> Self {
        Token::new(TokenKind::Keyword(text.into()), line)
    }

    pub fn newline(line: usize) -> Self {
        Token::keyword(NEWLINE, line)
    }

    pub fn composite(parts: Vec<Token>) -> Self {
        let line = parts.first().map(|t| t.line).unwrap_or(0);
        Token::new(TokenKind::Composite(parts), line)
    }

    pub fn nonterminal(name: impl Into<String>) -> Self {
        Token::new(TokenKind::Nonterminal(name.into()), 0)
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Keyword/operator text, if this is one.
    pub fn keyword_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Keyword(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.keyword_text() == Some(text)
    }

    pub fn is_newline(&self) -> bool {
        self.is_keyword(NEWLINE)
    }

    /// Identifier or constant, i.e. something a binary operator can follow.
    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier(_) | TokenKind::Constant(_)
        )
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (TokenKind::Keyword(a), TokenKind::Keyword(b)) => a == b,
            (TokenKind::Identifier(a), TokenKind::Identifier(b)) => a == b,
            (TokenKind::Label(a), TokenKind::Label(b)) => a == b,
            (TokenKind::Constant(a), TokenKind::Constant(b)) => (a - b).abs() < CONST_EPSILON,
            (TokenKind::Composite(a), TokenKind::Composite(b)) => a == b,
            (TokenKind::Nonterminal(a), TokenKind::Nonterminal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Identifier(name) | TokenKind::Label(name) => write!(f, "{}", name),
            TokenKind::Constant(value) => write!(f, "{}", value),
            TokenKind::Keyword(text) if text == NEWLINE => write!(f, "\\n"),
            TokenKind::Keyword(text) => write!(f, "{}", text),
            TokenKind::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            TokenKind::Nonterminal(name) => write!(f, "<{}>", name),
        }
    }
}
