use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::Level;

use prn::frontend::checker::CheckerKind;
use prn::frontend::lexer::Lexer;
use prn::frontend::parser::{ParserConfig, PrecedenceParser};
use prn::frontend::token_dumper::TokenDumper;
use prn::grammar::rules::build_grammar;
use prn::postfix::Program;
use prn::postfix::disasm::{print_program, print_stats};
use prn::runtime::ExecutorConfig;

/// Extension of binary postfix program files.
const PROGRAM_EXT: &str = "prnb";

/// Operator-precedence parser and postfix stack machine.
#[derive(Parser)]
#[command(name = "prn", version, about = "Operator-precedence parser and postfix stack machine")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tokens of a source file
    Tokens {
        file: PathBuf,
        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
        /// Also list the identifier, constant and label tables
        #[arg(long)]
        tables: bool,
    },

    /// Print the precedence relation matrix of the grammar
    Table,

    /// Lex, validate and syntax-check a source file
    Check {
        file: PathBuf,
        /// Print every shift/reduce step of the precedence automaton
        #[arg(long)]
        trace: bool,
        /// Syntax checker deciding acceptance
        #[arg(long, value_enum, default_value_t = ParserArg::Precedence)]
        parser: ParserArg,
    },

    /// Compose a source file into postfix and disassemble it
    Postfix {
        file: PathBuf,
        /// Write the program as a binary file instead of printing it
        #[arg(long)]
        emit: Option<PathBuf>,
        /// Print op statistics
        #[arg(long)]
        stats: bool,
    },

    /// Run a source file or a binary program with stdin/stdout
    Run {
        file: PathBuf,
        /// Abort after this many executed ops
        #[arg(long)]
        max_steps: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ParserArg {
    Precedence,
    Recursive,
    StateMachine,
}

impl From<ParserArg> for CheckerKind {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Precedence => CheckerKind::Precedence,
            ParserArg::Recursive => CheckerKind::Recursive,
            ParserArg::StateMachine => CheckerKind::StateMachine,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    match cli.command {
        Commands::Tokens {
            file,
            no_color,
            tables,
        } => dump_tokens(&read_source(&file), no_color, tables),
        Commands::Table => print_table(),
        Commands::Check {
            file,
            trace,
            parser,
        } => check(&read_source(&file), trace, parser.into()),
        Commands::Postfix { file, emit, stats } => {
            let program = or_exit(prn::compile(&read_source(&file))).program;
            match emit {
                Some(out) => emit_program(&program, &out),
                None => {
                    println!("{}", program);
                    println!();
                    print_program(&program);
                    if stats {
                        print_stats(&program);
                    }
                }
            }
        }
        Commands::Run { file, max_steps } => run(&file, ExecutorConfig { max_steps }),
    }
}

fn or_exit<T>(result: prn::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn read_source(filename: &Path) -> String {
    match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename.display(), e);
            process::exit(1);
        }
    }
}

fn dump_tokens(source: &str, no_color: bool, tables: bool) {
    match Lexer::new(source).tokenize() {
        Ok(lexed) => {
            let mut dumper = TokenDumper::new();

            if no_color {
                dumper = dumper.no_color();
            }
            if tables {
                dumper = dumper.with_tables();
            }

            dumper.dump(&lexed);
        }
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            process::exit(1);
        }
    }
}

fn print_table() {
    match PrecedenceParser::new(build_grammar()) {
        Ok(parser) => {
            let table = parser.table();
            println!(
                "{} symbols, {} relations\n",
                table.len(),
                table.relation_count()
            );
            print!("{}", table.render());
        }
        Err(e) => {
            eprintln!("Grammar error: {}", e);
            process::exit(1);
        }
    }
}

fn check(source: &str, trace: bool, checker: CheckerKind) {
    let compiled = or_exit(prn::compile_with(source, ParserConfig { trace, checker }));

    if trace {
        for (i, step) in compiled.parsed.steps.iter().enumerate() {
            println!("{:04}  {}", i, step);
        }
        println!();
    }

    for diagnostic in &compiled.diagnostics {
        println!("{}", diagnostic);
    }

    println!(
        "OK ({}): {} tokens, {} reductions",
        checker,
        compiled.lexed.tokens.len(),
        compiled.parsed.reductions
    );
    if !compiled.parsed.postfix.is_empty() {
        println!("expressions: {}", compiled.parsed.postfix);
    }
}

fn emit_program(program: &Program, out: &Path) {
    let bytes = match program.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Program file error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::write(out, &bytes) {
        eprintln!("Failed to write '{}': {}", out.display(), e);
        process::exit(1);
    }

    println!("wrote {} ops ({} bytes) to {}", program.len(), bytes.len(), out.display());
}

fn load_program(file: &Path) -> Program {
    if file.extension().and_then(|e| e.to_str()) == Some(PROGRAM_EXT) {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Failed to read '{}': {}", file.display(), e);
                process::exit(1);
            }
        };
        or_exit(Program::from_bytes(&bytes).map_err(prn::Error::from))
    } else {
        or_exit(prn::compile(&read_source(file))).program
    }
}

fn run(file: &Path, config: ExecutorConfig) {
    let program = load_program(file);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();

    let outcome = or_exit(prn::execute(&program, config, &mut input, &mut output));
    let _ = writeln!(output);
    drop(output);

    log::info!("finished after {} ops", outcome.steps);
    print!("{}", outcome.store);
    if let Some(value) = outcome.result {
        println!("result = {}", value);
    }
}
