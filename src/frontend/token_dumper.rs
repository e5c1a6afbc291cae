use std::fmt::Write as _;

use crate::frontend::lexer::Lexed;
use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_tables: bool, // also list the identifier/constant/label tables
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_tables: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const GRN: &'static str = "\x1b[32m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn with_tables(mut self) -> Self {
        self.show_tables = true;
        self
    }

    pub fn dump(&self, lexed: &Lexed) {
        print!("{}", self.render(lexed));
    }

    pub fn render(&self, lexed: &Lexed) -> String {
        let mut out = String::new();
        for (i, token) in lexed.tokens.iter().enumerate() {
            self.render_one(&mut out, i, token);
        }

        if self.show_tables {
            let _ = writeln!(out);
            render_table(&mut out, "identifiers", lexed.identifiers.iter());
            render_table(&mut out, "constants", lexed.constants.iter());
            render_table(&mut out, "labels", lexed.labels.iter());
        }
        out
    }

    fn render_one(&self, out: &mut String, i: usize, token: &Token) {
        let kind = self.kind(token);
        let colr = if self.color { self.color(token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };
        let index = token
            .index
            .map(|idx| format!(" #{}", idx))
            .unwrap_or_default();

        let _ = writeln!(
            out,
            "[{:02}:{:03}] {}{:<8} {}{}{}",
            token.line, i, colr, kind, token, index, reset
        );
    }

    fn kind(&self, t: &Token) -> &'static str {
        match &t.kind {
            TokenKind::Identifier(_) => "IDENT",
            TokenKind::Constant(_) => "CONST",
            TokenKind::Label(_) => "LABEL",
            TokenKind::Keyword(_) if t.is_newline() => "NEWLINE",
            TokenKind::Keyword(text) if text.chars().all(char::is_alphabetic) => "KEYWORD",
            TokenKind::Keyword(_) => "OP",
            TokenKind::Composite(_) | TokenKind::Nonterminal(_) => "GRAMMAR",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        match &t.kind {
            TokenKind::Keyword(_) if t.is_newline() => Self::DIM,
            TokenKind::Identifier(_) => Self::YEL,
            TokenKind::Constant(_) => Self::CYN,
            TokenKind::Label(_) => Self::GRN,
            TokenKind::Keyword(text) if !text.chars().all(char::is_alphabetic) => Self::MAG,
            _ => Self::RESET,
        }
    }
}

fn render_table<T: std::fmt::Display>(out: &mut String, title: &str, items: impl Iterator<Item = T>) {
    let _ = writeln!(out, "{}:", title);
    for (i, item) in items.enumerate() {
        let _ = writeln!(out, "  {:>3}  {}", i, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn lexed(source: &str) -> Lexed {
        Lexer::new(source).tokenize().expect("lexing should succeed")
    }

    #[test]
    fn test_render_plain() {
        let out = TokenDumper::new()
            .no_color()
            .render(&lexed("begin\na = 1\nend"));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "[01:000] KEYWORD  begin");
        assert_eq!(lines[1], "[01:001] NEWLINE  \\n");
        assert_eq!(lines[2], "[02:002] IDENT    a #0");
        assert_eq!(lines[3], "[02:003] OP       =");
        assert_eq!(lines[4], "[02:004] CONST    1 #0");
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_render_tables() {
        let out = TokenDumper::new()
            .no_color()
            .with_tables()
            .render(&lexed("begin\nm: a = 2.5\nend"));

        assert!(out.contains("LABEL    m #0"));
        assert!(out.contains("identifiers:\n    0  a\n"));
        assert!(out.contains("constants:\n    0  2.5\n"));
        assert!(out.contains("labels:\n    0  m\n"));
    }

    #[test]
    fn test_color_codes() {
        let out = TokenDumper::new().render(&lexed("begin\nend"));
        assert!(out.contains("\x1b[0m"));
    }
}
