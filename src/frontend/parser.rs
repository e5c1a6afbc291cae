use std::fmt;

use crate::frontend::checker::CheckerKind;
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::grammar::rules::Grammar;
use crate::grammar::symbol::Symbol;
use crate::grammar::table::{GrammarError, PrecedenceTable, Relation};
use crate::postfix::Program;

#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Record every automaton step in `Parsed::steps`.
    pub trace: bool,
    /// Checker run ahead of the precedence pass. Its error is the one
    /// reported when the program is rejected.
    pub checker: CheckerKind,
}

/// One stack entry: the grammar symbol and the token it came from.
#[derive(Debug, Clone)]
struct Entry {
    symbol: Symbol,
    token: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Shift(Relation),
    Reduce { lhs: Symbol, base: String },
    Accept,
}

/// Automaton state before an action was taken.
#[derive(Debug, Clone)]
pub struct Step {
    pub stack: String,
    pub input: String,
    pub action: Action,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match &self.action {
            Action::Shift(relation) => format!("shift ({})", relation),
            Action::Reduce { lhs, base } => format!("reduce {} -> {}", lhs, base),
            Action::Accept => "accept".to_string(),
        };
        write!(f, "{:<40} | {:<30} | {}", self.stack, self.input, action)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parsed {
    /// Code emitted by rule callbacks, in reduction order.
    pub postfix: Program,
    pub steps: Vec<Step>,
    pub reductions: usize,
}

/// Shift/reduce automaton driven by a precedence table.
pub struct PrecedenceParser {
    grammar: Grammar,
    table: PrecedenceTable,
    config: ParserConfig,
}

impl PrecedenceParser {
    pub fn new(grammar: Grammar) -> Result<Self, GrammarError> {
        Self::with_config(grammar, ParserConfig::default())
    }

    pub fn with_config(grammar: Grammar, config: ParserConfig) -> Result<Self, GrammarError> {
        let table = PrecedenceTable::build(&grammar)?;
        Ok(Self {
            grammar,
            table,
            config,
        })
    }

    pub fn table(&self) -> &PrecedenceTable {
        &self.table
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// True when `tokens` form a program of the grammar.
    pub fn accepts(&self, tokens: &[Token]) -> bool {
        self.check_syntax(tokens).is_ok()
    }

    pub fn check_syntax(&self, tokens: &[Token]) -> Result<Parsed, ParserError> {
        let input = self.classify(tokens)?;
        let mut parsed = Parsed::default();

        let mut stack = vec![Entry {
            symbol: Symbol::End,
            token: Token::keyword("#", 0),
        }];
        let mut pos = 0;

        loop {
            let (top, next) = match (stack.last(), input.get(pos)) {
                (Some(top), Some(next)) => (top.symbol, next),
                _ => {
                    return Err(ParserError::NoRule {
                        base: "#".to_string(),
                        line: last_line(tokens),
                    });
                }
            };

            if top == self.grammar.axiom && next.symbol == Symbol::End {
                self.record(&mut parsed, &stack, &input[pos..], Action::Accept);
                break;
            }

            match self.table.get(top, next.symbol) {
                None => {
                    return Err(ParserError::NoRelation {
                        left: top,
                        right: next.symbol,
                        line: next.token.line,
                    });
                }
                Some(Relation::More) => {
                    let (lhs, base) = self.reduce(&mut stack, &mut parsed.postfix)?;
                    parsed.reductions += 1;
                    self.record(&mut parsed, &stack, &input[pos..], Action::Reduce { lhs, base });
                }
                Some(relation) => {
                    self.record(&mut parsed, &stack, &input[pos..], Action::Shift(relation));
                    stack.push(next.clone());
                    pos += 1;
                }
            }
        }

        log::debug!(
            "parsed {} tokens with {} reductions",
            tokens.len(),
            parsed.reductions
        );

        Ok(parsed)
    }

    /// Maps tokens to grammar symbols and appends the end marker.
    fn classify(&self, tokens: &[Token]) -> Result<Vec<Entry>, ParserError> {
        let mut input = Vec::with_capacity(tokens.len() + 1);
        for token in tokens {
            let symbol = self
                .grammar
                .classify(token)
                .ok_or_else(|| ParserError::UnknownToken {
                    token: token.to_string(),
                    line: token.line,
                })?;
            input.push(Entry {
                symbol,
                token: token.clone(),
            });
        }
        input.push(Entry {
            symbol: Symbol::End,
            token: Token::keyword("#", last_line(tokens)),
        });
        Ok(input)
    }

    /// Pops the base, reduces it by the first matching rule and pushes the
    /// rule's left-hand side.
    fn reduce(
        &self,
        stack: &mut Vec<Entry>,
        out: &mut Program,
    ) -> Result<(Symbol, String), ParserError> {
        let mut base: Vec<Entry> = Vec::new();
        base.extend(stack.pop());

        loop {
            let (Some(top), Some(last)) = (stack.last(), base.last()) else {
                break;
            };
            match self.table.get(top.symbol, last.symbol) {
                Some(Relation::Less) => break,
                Some(_) => base.extend(stack.pop()),
                None => {
                    return Err(ParserError::NoRelation {
                        left: top.symbol,
                        right: last.symbol,
                        line: last.token.line,
                    });
                }
            }
        }

        base.reverse();

        let rhs: Vec<Symbol> = base.iter().map(|e| e.symbol).collect();
        let rendered = render_symbols(&rhs);
        let line = base.first().map(|e| e.token.line).unwrap_or(0);

        let rule = self
            .grammar
            .find_rule(&rhs)
            .ok_or_else(|| ParserError::NoRule {
                base: rendered.clone(),
                line,
            })?;

        if let Some(emit) = rule.emit {
            let tokens: Vec<Token> = base.into_iter().map(|e| e.token).collect();
            emit(&tokens, out);
        }

        let mut token = Token::nonterminal(rule.lhs.to_string());
        token.line = line;
        stack.push(Entry {
            symbol: rule.lhs,
            token,
        });

        Ok((rule.lhs, rendered))
    }

    fn record(&self, parsed: &mut Parsed, stack: &[Entry], input: &[Entry], action: Action) {
        let step = Step {
            stack: render_symbols(&stack.iter().map(|e| e.symbol).collect::<Vec<_>>()),
            input: render_symbols(&input.iter().take(6).map(|e| e.symbol).collect::<Vec<_>>()),
            action,
        };
        log::trace!("{}", step);
        if self.config.trace {
            parsed.steps.push(step);
        }
    }
}

fn render_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn last_line(tokens: &[Token]) -> usize {
    tokens.last().map(|t| t.line).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::grammar::rules::{build_grammar, PROGRAM};

    fn parser() -> PrecedenceParser {
        PrecedenceParser::new(build_grammar()).unwrap()
    }

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap().tokens
    }

    fn program(decls: &str, body: &str) -> String {
        format!("program test\nvar {}\nbegin\n{}\nend", decls, body)
    }

    fn check(source: &str) -> Result<Parsed, ParserError> {
        parser().check_syntax(&tokens(source))
    }

    fn assert_accepts(decls: &str, body: &str) {
        let source = program(decls, body);
        if let Err(e) = check(&source) {
            panic!("expected program to parse, got {}\n{}", e, source);
        }
    }

    #[test]
    fn test_assignments() {
        assert_accepts(",a,b : float", "a = (2 + 8) * ((3 + 4) / 2)\nb = -a");
    }

    #[test]
    fn test_labels_and_if() {
        assert_accepts(",a : float", "m: a = a + 1\nif a < 3 then goto m");
    }

    #[test]
    fn test_logical_expression() {
        assert_accepts(
            ",a : float",
            "m: a = a + 1\nif [a == 1 and ![a == 2]] or a > 5 then goto m",
        );
    }

    #[test]
    fn test_loops() {
        assert_accepts(",i,sum : float", "do i = 1 to 5\nsum = sum + i\nnext");
        assert_accepts(
            ",i,j,s : float",
            "do i = 1 to 3\ndo j = 1 to i * 2\ns = s + j\nnext\nnext\nwritel(,s)",
        );
    }

    #[test]
    fn test_io_and_definition_lists() {
        assert_accepts(",a,b : float; ,c : float", "readl(,a,b)\nwritel(,a)");
    }

    #[test]
    fn test_emitted_postfix() {
        let parsed = check(&program(
            ",a,b : float",
            "a = (2 + 8) * ((3 + 4) / 2)\nb = -a",
        ))
        .unwrap();
        assert_eq!(parsed.postfix.to_string(), "2 8 + 3 4 + 2 / * a @");
    }

    #[test]
    fn test_emitted_logic() {
        let parsed = check(&program(
            ",a : float",
            "m: a = a + 1\nif [a == 1 and ![a == 2]] or a > 5 then goto m",
        ))
        .unwrap();
        assert_eq!(
            parsed.postfix.to_string(),
            "a 1 + a 1 == a 2 == ! and a 5 > or"
        );
    }

    #[test]
    fn test_missing_operand() {
        let err = check(&program(",a : float", "a = + 1")).unwrap_err();
        match err {
            ParserError::NoRelation { left, right, line } => {
                assert_eq!(left, Symbol::keyword("="));
                assert_eq!(right, Symbol::keyword("+"));
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_paren() {
        let err = check(&program(",a : float", "a = (1")).unwrap_err();
        assert!(matches!(err, ParserError::NoRule { line: 4, .. }), "{:?}", err);
        assert!(err.to_string().contains("( Expression1"));
    }

    #[test]
    fn test_double_minus_is_rejected() {
        let err = check(&program(",a : float", "a = - -4")).unwrap_err();
        assert!(matches!(err, ParserError::NoRelation { .. }));
    }

    #[test]
    fn test_unknown_token() {
        let mut toks = tokens(&program(",a : float", "a = 1"));
        toks.insert(8, Token::keyword("%", 3));
        let err = parser().check_syntax(&toks).unwrap_err();
        assert!(matches!(err, ParserError::UnknownToken { line: 3, .. }));
    }

    #[test]
    fn test_trace_records_steps() {
        let config = ParserConfig {
            trace: true,
            ..Default::default()
        };
        let parser = PrecedenceParser::with_config(build_grammar(), config).unwrap();
        let parsed = parser
            .check_syntax(&tokens(&program(",a : float", "a = 1")))
            .unwrap();

        assert!(!parsed.steps.is_empty());
        assert_eq!(parsed.steps.last().unwrap().action, Action::Accept);
        assert!(parsed.steps.iter().any(|s| matches!(
            s.action,
            Action::Reduce { lhs, .. } if lhs == PROGRAM
        )));
    }

    #[test]
    fn test_no_trace_by_default() {
        let parsed = check(&program(",a : float", "a = 1")).unwrap();
        assert!(parsed.steps.is_empty());
        assert!(parsed.reductions > 0);
    }

    #[test]
    fn test_accepts() {
        let p = parser();
        assert!(p.accepts(&tokens(&program(",a : float", "a = 1"))));
        assert!(!p.accepts(&tokens(&program(",a : float", "a = = 1"))));
    }
}
