use std::collections::BTreeMap;
use std::fmt;

use crate::grammar::rules::Grammar;
use crate::grammar::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Less,
    Equal,
    More,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Less => write!(f, "<"),
            Relation::Equal => write!(f, "="),
            Relation::More => write!(f, ">"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    /// Two different relations for one cell: the grammar is not a
    /// precedence grammar.
    #[error(
        "precedence conflict between '{left}' and '{right}': '{existing}' already recorded, '{attempted}' attempted"
    )]
    Conflict {
        left: Symbol,
        right: Symbol,
        existing: Relation,
        attempted: Relation,
    },
}

/// Precedence relation matrix, `left -> right -> relation`.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceTable {
    rows: BTreeMap<Symbol, BTreeMap<Symbol, Relation>>,
}

impl PrecedenceTable {
    pub fn build(grammar: &Grammar) -> Result<Self, GrammarError> {
        let mut table = PrecedenceTable::default();

        // Equal: adjacent symbols of every right-hand side
        let mut equal = Vec::new();
        for rule in &grammar.rules {
            for pair in rule.rhs.windows(2) {
                table.set(pair[0], pair[1], Relation::Equal)?;
                equal.push((pair[0], pair[1]));
            }
            if let Some(last) = rule.rhs.last() {
                table.rows.entry(*last).or_default();
            }
        }

        // More: LAST+(N) > t for N = t
        for &(left, right) in &equal {
            if left.is_nonterminal() && !right.is_nonterminal() {
                for x in last_plus(grammar, left) {
                    table.set(x, right, Relation::More)?;
                }
            }
        }

        // Less: t < FIRST+(M) for t = M
        for &(left, right) in &equal {
            if !left.is_nonterminal() && right.is_nonterminal() {
                for y in first_plus(grammar, right) {
                    table.set(left, y, Relation::Less)?;
                }
            }
        }

        // L = M, both nonterminals
        for &(left, right) in &equal {
            if left.is_nonterminal() && right.is_nonterminal() {
                let first = first_plus(grammar, right);
                for x in last_plus(grammar, left) {
                    for &y in &first {
                        table.set(x, y, Relation::More)?;
                    }
                }
                for &y in &first {
                    table.set(left, y, Relation::Less)?;
                }
            }
        }

        // end marker brackets everything
        let known: Vec<Symbol> = table.rows.keys().copied().collect();
        for &symbol in &known {
            table.set(symbol, Symbol::End, Relation::More)?;
        }
        for &symbol in &known {
            table.set(Symbol::End, symbol, Relation::Less)?;
        }

        log::debug!(
            "precedence table: {} rows, {} relations",
            table.rows.len(),
            table.relation_count()
        );

        Ok(table)
    }

    fn set(&mut self, left: Symbol, right: Symbol, relation: Relation) -> Result<(), GrammarError> {
        let row = self.rows.entry(left).or_default();
        match row.get(&right) {
            Some(&existing) if existing != relation => Err(GrammarError::Conflict {
                left,
                right,
                existing,
                attempted: relation,
            }),
            Some(_) => Ok(()),
            None => {
                row.insert(right, relation);
                Ok(())
            }
        }
    }

    pub fn get(&self, left: Symbol, right: Symbol) -> Option<Relation> {
        self.rows.get(&left).and_then(|row| row.get(&right)).copied()
    }

    /// Number of rows (left symbols), the end marker included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn relation_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Every symbol that appears as a row or a column.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self.rows.keys().copied().collect();
        for row in self.rows.values() {
            for symbol in row.keys() {
                if !out.contains(symbol) {
                    out.push(*symbol);
                }
            }
        }
        out.sort();
        out
    }

    /// Text matrix, one row per left symbol.
    pub fn render(&self) -> String {
        let symbols = self.symbols();
        let names: Vec<String> = symbols.iter().map(Symbol::to_string).collect();
        let row_width = names.iter().map(String::len).max().unwrap_or(0);

        let mut out = String::new();
        out.push_str(&" ".repeat(row_width));
        for name in &names {
            out.push_str(&format!(" {}", name));
        }
        out.push('\n');

        for (left, left_name) in symbols.iter().zip(&names) {
            if !self.rows.contains_key(left) {
                continue;
            }
            out.push_str(&format!("{:<width$}", left_name, width = row_width));
            for (right, right_name) in symbols.iter().zip(&names) {
                let cell = match self.get(*left, *right) {
                    Some(relation) => relation.to_string(),
                    None => ".".to_string(),
                };
                out.push_str(&format!(" {:^width$}", cell, width = right_name.len()));
            }
            out.push('\n');
        }

        out
    }
}

/// FIRST+(symbol): every symbol that can begin a derivation of `symbol`.
pub fn first_plus(grammar: &Grammar, symbol: Symbol) -> Vec<Symbol> {
    closure(grammar, symbol, |rhs| rhs.first().copied())
}

/// LAST+(symbol): every symbol that can end a derivation of `symbol`.
pub fn last_plus(grammar: &Grammar, symbol: Symbol) -> Vec<Symbol> {
    closure(grammar, symbol, |rhs| rhs.last().copied())
}

fn closure(grammar: &Grammar, symbol: Symbol, pick: fn(&[Symbol]) -> Option<Symbol>) -> Vec<Symbol> {
    let mut out = Vec::new();
    for rule in grammar.productions(symbol) {
        if let Some(s) = pick(&rule.rhs) {
            visit(grammar, s, pick, &mut out);
        }
    }
    out
}

fn visit(
    grammar: &Grammar,
    symbol: Symbol,
    pick: fn(&[Symbol]) -> Option<Symbol>,
    out: &mut Vec<Symbol>,
) {
    if out.contains(&symbol) {
        return;
    }
    out.push(symbol);

    if symbol.is_nonterminal() {
        for rule in grammar.productions(symbol) {
            if let Some(s) = pick(&rule.rhs) {
                visit(grammar, s, pick, out);
            }
        }
    }
}
