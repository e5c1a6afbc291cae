use crate::frontend::lexer::LexerError;
use crate::frontend::parser_error::ParserError;
use crate::grammar::table::GrammarError;
use crate::postfix::compose_error::ComposeError;
use crate::runtime::runtime_error::RuntimeError;

/// Any failure of the pipeline, tagged by stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Parse error: {0}")]
    Parser(#[from] ParserError),

    #[error("{0}")]
    Compose(#[from] ComposeError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Program file error: {0}")]
    Decode(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
