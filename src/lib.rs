//! Operator-precedence front end and postfix stack machine for a small
//! line-oriented language with `float` variables, `if ... then goto`,
//! `do ... to ... next` loops and `readl`/`writel`.
//!
//! The pipeline is `Lexer -> PrecedenceParser (syntax check) -> compose
//! (postfix) -> Executor`. [`compile`] and [`execute`] wire the stages
//! together; each stage is also usable on its own. The syntax check can
//! also be done by a recursive-descent or a state-machine checker, see
//! [`frontend::checker`].

pub mod error;
pub mod frontend;
pub mod grammar;
pub mod postfix;
pub mod runtime;

use std::io::{BufRead, Write};

pub use error::{Error, Result};

use crate::frontend::checker::{CheckerKind, SyntaxChecker};
use crate::frontend::lexer::{Lexed, Lexer};
use crate::frontend::parser::{Parsed, ParserConfig, PrecedenceParser};
use crate::frontend::validate::{Diagnostic, validate};
use crate::grammar::rules::build_grammar;
use crate::postfix::{Program, compose, compose_expression};
use crate::runtime::{Executor, ExecutorConfig, VariableStore};

/// Everything the front end produced for one source text.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub lexed: Lexed,
    pub diagnostics: Vec<Diagnostic>,
    pub parsed: Parsed,
    pub program: Program,
}

/// Result of running a program to completion.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub store: VariableStore,
    pub result: Option<f32>,
    pub steps: usize,
}

pub fn compile(source: &str) -> Result<Compiled> {
    compile_with(source, ParserConfig::default())
}

/// Lexes, validates, syntax-checks and composes `source`.
pub fn compile_with(source: &str, config: ParserConfig) -> Result<Compiled> {
    let lexed = Lexer::new(source).tokenize()?;
    let diagnostics = validate(&lexed.tokens);

    if config.checker != CheckerKind::Precedence {
        config.checker.build()?.check(&lexed.tokens)?;
        log::debug!("{} check passed", config.checker);
    }

    let parser = PrecedenceParser::with_config(build_grammar(), config)?;
    let parsed = parser.check_syntax(&lexed.tokens)?;
    log::debug!("syntax ok after {} reductions", parsed.reductions);

    let mut labels = Vec::new();
    let mut scratch = VariableStore::new();
    let program = compose(&lexed.tokens, &mut labels, &mut scratch)?;
    log::debug!("composed {} ops", program.len());

    Ok(Compiled {
        lexed,
        diagnostics,
        parsed,
        program,
    })
}

/// Runs `program` on a fresh store holding zero for every identifier.
pub fn execute(
    program: &Program,
    config: ExecutorConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Outcome> {
    let mut store = VariableStore::new();
    store.prepare(program);

    let mut executor = Executor::with_config(config);
    let result = executor.execute(program, &mut store, input, output)?;

    Ok(Outcome {
        store,
        result,
        steps: executor.steps(),
    })
}

/// Compiles and runs `source` with in-memory I/O. Returns the outcome and
/// everything the program wrote.
pub fn run_source(source: &str, input: &str) -> Result<(Outcome, String)> {
    let compiled = compile(source)?;
    let mut reader = input.as_bytes();
    let mut output = Vec::new();
    let outcome = execute(
        &compiled.program,
        ExecutorConfig::default(),
        &mut reader,
        &mut output,
    )?;
    Ok((outcome, String::from_utf8_lossy(&output).into_owned()))
}

/// Evaluates a bare expression against `store`. Identifiers must already
/// be in the store; assignments in `expression` write to it.
pub fn evaluate(expression: &str, store: &mut VariableStore) -> Result<Option<f32>> {
    let lexed = Lexer::new(expression).tokenize()?;
    let program = compose_expression(&lexed.tokens, &mut Vec::new(), &mut VariableStore::new())?;
    log::debug!("expression composed to {}", program);

    let mut executor = Executor::new();
    Ok(executor.execute(&program, store, &mut std::io::empty(), &mut std::io::sink())?)
}

