pub mod rules;
pub mod symbol;
pub mod table;

pub use rules::{Grammar, GrammarRule, build_grammar};
pub use symbol::{Symbol, Terminal};
pub use table::{GrammarError, PrecedenceTable, Relation};
