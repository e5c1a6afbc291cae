use crate::frontend::token::{CONST_EPSILON, KEYWORDS, Token};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

/// Lexer output: the token stream plus the per-program tables that back
/// each token's `index`.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub identifiers: Vec<String>,
    pub constants: Vec<f32>,
    pub labels: Vec<String>,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    // labels only exist inside the statement body
    in_body: bool,
    out: Lexed,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            in_body: false,
            out: Lexed::default(),
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn error(&self, message: impl Into<String>) -> LexerError {
        LexerError {
            message: message.into(),
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes a run of line breaks (and blanks between them). Returns the
    /// line the first break terminates.
    fn skip_newlines(&mut self) -> usize {
        let line = self.line;
        while let Some(ch) = self.current() {
            if ch == '\n' || ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
        line
    }

    /// Next non-blank character on the current line.
    fn next_significant(&self) -> Option<char> {
        self.source[self.pos..]
            .iter()
            .copied()
            .find(|c| *c != ' ' && *c != '\t' && *c != '\r')
    }

    fn previous_is(&self, text: &str) -> bool {
        self.out.tokens.last().is_some_and(|t| t.is_keyword(text))
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;

        let mut digits = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                digits.push('.');
                self.advance();
            } else {
                break;
            }
        }

        if digits == "." {
            return Err(LexerError {
                message: "expected digits after '.'".to_string(),
                line: start_line,
                col: start_col,
            });
        }

        let value: f32 = digits.parse().map_err(|_| LexerError {
            message: format!("invalid number: {}", digits),
            line: start_line,
            col: start_col,
        })?;

        let index = match self
            .out
            .constants
            .iter()
            .position(|c| (c - value).abs() < CONST_EPSILON)
        {
            Some(index) => index,
            None => {
                self.out.constants.push(value);
                self.out.constants.len() - 1
            }
        };

        Ok(Token::constant(value, start_line).with_index(index))
    }

    fn read_word(&mut self) -> Token {
        let line = self.line;
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if KEYWORDS.contains(&word.as_str()) {
            if word == "begin" {
                self.in_body = true;
            }
            return Token::keyword(word, line);
        }

        let is_label =
            self.in_body && (self.next_significant() == Some(':') || self.previous_is("goto"));

        if is_label {
            let index = intern(&mut self.out.labels, &word);
            Token::label(word, line).with_index(index)
        } else {
            let index = intern(&mut self.out.identifiers, &word);
            Token::identifier(word, line).with_index(index)
        }
    }

    fn read_operator(&mut self) -> Option<Token> {
        let line = self.line;
        let ch = self.current()?;
        let next = self.peek();

        let text = match (ch, next) {
            ('<', Some('=')) => "<=",
            ('>', Some('=')) => ">=",
            ('=', Some('=')) => "==",
            ('!', Some('=')) => "!=",
            ('<', _) => "<",
            ('>', _) => ">",
            ('=', _) => "=",
            ('!', _) => "!",
            ('+', _) => "+",
            ('-', _) => "-",
            ('*', _) => "*",
            ('/', _) => "/",
            ('(', _) => "(",
            (')', _) => ")",
            ('[', _) => "[",
            (']', _) => "]",
            (',', _) => ",",
            (';', _) => ";",
            (':', _) => ":",
            _ => return None,
        };

        for _ in 0..text.len() {
            self.advance();
        }

        Some(Token::keyword(text, line))
    }

    pub fn tokenize(mut self) -> Result<Lexed, LexerError> {
        loop {
            self.skip_whitespace();

            match self.current() {
                None => break,
                Some('\n') => {
                    let line = self.skip_newlines();
                    // no break token at the very start or the very end
                    if !self.out.tokens.is_empty() && self.current().is_some() {
                        self.out.tokens.push(Token::newline(line));
                    }
                }
                Some(ch) if ch.is_ascii_digit() => {
                    let token = self.read_number()?;
                    self.out.tokens.push(token);
                }
                Some('.') if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                    let token = self.read_number()?;
                    self.out.tokens.push(token);
                }
                Some(ch) if ch.is_ascii_alphabetic() => {
                    let token = self.read_word();
                    self.out.tokens.push(token);
                }
                Some(ch) => match self.read_operator() {
                    Some(token) => self.out.tokens.push(token),
                    None => return Err(self.error(format!("unexpected character: '{}'", ch))),
                },
            }
        }

        log::debug!(
            "lexed {} tokens ({} identifiers, {} constants, {} labels)",
            self.out.tokens.len(),
            self.out.identifiers.len(),
            self.out.constants.len(),
            self.out.labels.len()
        );

        Ok(self.out)
    }
}

fn intern(table: &mut Vec<String>, name: &str) -> usize {
    match table.iter().position(|n| n == name) {
        Some(index) => index,
        None => {
            table.push(name.to_string());
            table.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::TokenKind;

    fn lex(source: &str) -> Lexed {
        Lexer::new(source).tokenize().unwrap()
    }

    fn texts(source: &str) -> Vec<String> {
        lex(source).tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_program_header() {
        let t = texts("program test\nvar ,a,b : float\nbegin");
        assert_eq!(
            t,
            vec![
                "program", "test", "\\n", "var", ",", "a", ",", "b", ":", "float", "\\n", "begin"
            ]
        );
    }

    #[test]
    fn test_newline_runs_collapse() {
        let lexed = lex("a\n\n   \n b");
        assert_eq!(lexed.tokens.len(), 3);
        assert!(lexed.tokens[1].is_newline());
        assert_eq!(lexed.tokens[1].line, 1);
        assert_eq!(lexed.tokens[2].line, 4);
    }

    #[test]
    fn test_leading_and_trailing_newlines_dropped() {
        let lexed = lex("\n\nprogram x\n\n");
        assert_eq!(lexed.tokens.len(), 2);
    }

    #[test]
    fn test_operators() {
        let t = texts("<= >= == != < > = ! + - * / ( ) [ ] , ; :");
        assert_eq!(
            t,
            vec![
                "<=", ">=", "==", "!=", "<", ">", "=", "!", "+", "-", "*", "/", "(", ")", "[",
                "]", ",", ";", ":"
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let lexed = lex("12 3.5 .25 7.");
        let values: Vec<f32> = lexed
            .tokens
            .iter()
            .map(|t| match t.kind {
                TokenKind::Constant(v) => v,
                _ => panic!("expected constant, got {:?}", t),
            })
            .collect();
        assert_eq!(values, vec![12.0, 3.5, 0.25, 7.0]);
    }

    #[test]
    fn test_second_dot_starts_new_number() {
        let t = texts("152.28.46");
        assert_eq!(t, vec!["152.28", "0.46"]);
    }

    #[test]
    fn test_constants_are_deduplicated() {
        let lexed = lex("1 2 1.000001 2");
        assert_eq!(lexed.constants, vec![1.0, 2.0]);
        let indices: Vec<_> = lexed.tokens.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn test_identifiers_get_stable_index() {
        let lexed = lex("a b a");
        assert_eq!(lexed.identifiers, vec!["a", "b"]);
        assert_eq!(lexed.tokens[2].index, Some(0));
    }

    #[test]
    fn test_labels_only_in_body() {
        let lexed = lex("var ,b : float\nbegin\nm: if b == 1 then goto m\nend");

        // `b :` in the declarations is an identifier
        assert!(matches!(lexed.tokens[2].kind, TokenKind::Identifier(_)));

        let labels: Vec<_> = lexed
            .tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Label(_)))
            .collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].index, labels[1].index);
        assert_eq!(lexed.labels, vec!["m"]);
    }

    #[test]
    fn test_keywords() {
        let lexed = lex("do i = 1 to 5 next");
        assert!(lexed.tokens[0].is_keyword("do"));
        assert!(lexed.tokens[4].is_keyword("to"));
        assert!(lexed.tokens[6].is_keyword("next"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("a = 1\nb = 2 $").tokenize().unwrap_err();
        assert!(err.message.contains("unexpected character"));
        assert_eq!(err.line, 2);
        assert_eq!(err.col, 7);
    }
}
