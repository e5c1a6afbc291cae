pub mod checker;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod recursive;
pub mod state_machine;
pub mod token;
pub mod token_dumper;
pub mod validate;

pub use checker::{CheckerKind, SyntaxChecker};
pub use lexer::{Lexed, Lexer, LexerError};
pub use token::{Token, TokenKind};
