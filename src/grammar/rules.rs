use crate::frontend::token::{NEWLINE, Token, TokenKind};
use crate::grammar::symbol::{Symbol, Terminal};
use crate::postfix::{Op, Program};

/// Code emitted when the parser reduces by a rule. Receives the concrete
/// tokens of the reduced base, left to right.
pub type Emit = fn(&[Token], &mut Program);

#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub emit: Option<Emit>,
}

impl GrammarRule {
    pub fn new(lhs: Symbol, rhs: &[Symbol]) -> Self {
        GrammarRule {
            lhs,
            rhs: rhs.to_vec(),
            emit: None,
        }
    }

    pub fn with_emit(mut self, emit: Emit) -> Self {
        self.emit = Some(emit);
        self
    }

    /// Right-hand side as a composite token.
    pub fn rhs_token(&self) -> Token {
        Token::composite(self.rhs.iter().map(Symbol::to_token).collect())
    }
}

/// An ordered, immutable list of productions with a distinguished axiom.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub axiom: Symbol,
    pub rules: Vec<GrammarRule>,
}

impl Grammar {
    pub fn new(axiom: Symbol, rules: Vec<GrammarRule>) -> Self {
        Grammar { axiom, rules }
    }

    /// Productions of `lhs`, in declaration order.
    pub fn productions(&self, lhs: Symbol) -> impl Iterator<Item = &GrammarRule> {
        self.rules.iter().filter(move |r| r.lhs == lhs)
    }

    /// First rule whose right-hand side is exactly `rhs`.
    pub fn find_rule(&self, rhs: &[Symbol]) -> Option<&GrammarRule> {
        self.rules.iter().find(|r| r.rhs == rhs)
    }

    /// Every terminal, in order of first appearance.
    pub fn terminals(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = Vec::new();
        for symbol in self.rules.iter().flat_map(|r| r.rhs.iter()) {
            if symbol.is_terminal() && !out.contains(symbol) {
                out.push(*symbol);
            }
        }
        out
    }

    /// Grammar symbol for a concrete token: the first terminal whose
    /// recognizer accepts it.
    pub fn classify(&self, token: &Token) -> Option<Symbol> {
        self.terminals().into_iter().find(|s| s.recognizes(token))
    }
}

// Nonterminals

pub const PROGRAM: Symbol = Symbol::nonterminal("Program");
pub const PROGRAM_NAME: Symbol = Symbol::nonterminal("ProgramName");
pub const DEF_LIST: Symbol = Symbol::nonterminal("DefList");
pub const DEF_LIST1: Symbol = Symbol::nonterminal("DefList1");
pub const DEF: Symbol = Symbol::nonterminal("Def");
pub const ID_LIST: Symbol = Symbol::nonterminal("IdList");
pub const ID_LIST1: Symbol = Symbol::nonterminal("IdList1");
pub const STATEMENT_LIST: Symbol = Symbol::nonterminal("StatementList");
pub const STATEMENT_LIST1: Symbol = Symbol::nonterminal("StatementList1");
pub const STATEMENT: Symbol = Symbol::nonterminal("Statement");
pub const UNLABELED_STATEMENT: Symbol = Symbol::nonterminal("UnlabeledStatement");
pub const EXPRESSION: Symbol = Symbol::nonterminal("Expression");
pub const EXPRESSION1: Symbol = Symbol::nonterminal("Expression1");
pub const EXPRESSION2: Symbol = Symbol::nonterminal("Expression2");
pub const TERM: Symbol = Symbol::nonterminal("Term");
pub const TERM1: Symbol = Symbol::nonterminal("Term1");
pub const MULT: Symbol = Symbol::nonterminal("Mult");
pub const LOGICAL_EXPRESSION: Symbol = Symbol::nonterminal("LogicalExpression");
pub const LOGICAL_EXPRESSION1: Symbol = Symbol::nonterminal("LogicalExpression1");
pub const LOGICAL_TERM: Symbol = Symbol::nonterminal("LogicalTerm");
pub const LOGICAL_TERM1: Symbol = Symbol::nonterminal("LogicalTerm1");
pub const LOGICAL_MULT: Symbol = Symbol::nonterminal("LogicalMult");
pub const RELATION: Symbol = Symbol::nonterminal("Relation");

// Token classes

pub const ID: Symbol = Symbol::Terminal(Terminal::Identifier);
pub const CONST: Symbol = Symbol::Terminal(Terminal::Constant);
pub const LABEL: Symbol = Symbol::Terminal(Terminal::Label);
pub const NL: Symbol = Symbol::keyword(NEWLINE);

const fn kw(text: &'static str) -> Symbol {
    Symbol::keyword(text)
}

pub const RELATIONAL_OPERATORS: [&str; 6] = ["<", "<=", ">", ">=", "==", "!="];

/// The language grammar. Rule order matters: token classification and
/// reduction both take the first match.
pub fn build_grammar() -> Grammar {
    let mut rules = vec![
        // program structure
        GrammarRule::new(
            PROGRAM,
            &[
                PROGRAM_NAME,
                NL,
                kw("var"),
                DEF_LIST1,
                NL,
                kw("begin"),
                STATEMENT_LIST1,
                kw("end"),
            ],
        ),
        // declarations
        GrammarRule::new(DEF_LIST, &[DEF_LIST, kw(";"), DEF]),
        GrammarRule::new(DEF_LIST, &[DEF]),
        GrammarRule::new(DEF_LIST1, &[DEF_LIST]),
        GrammarRule::new(DEF, &[ID_LIST1, kw(":"), kw("float")]),
        // statements
        GrammarRule::new(STATEMENT_LIST, &[STATEMENT_LIST, NL, STATEMENT]),
        GrammarRule::new(STATEMENT_LIST, &[NL, STATEMENT]),
        GrammarRule::new(STATEMENT, &[UNLABELED_STATEMENT]),
        GrammarRule::new(STATEMENT, &[LABEL, kw(":"), UNLABELED_STATEMENT]),
        GrammarRule::new(STATEMENT_LIST1, &[STATEMENT_LIST, NL]),
        GrammarRule::new(UNLABELED_STATEMENT, &[ID, kw("="), EXPRESSION1]),
        GrammarRule::new(
            UNLABELED_STATEMENT,
            &[kw("readl"), kw("("), ID_LIST1, kw(")")],
        ),
        GrammarRule::new(
            UNLABELED_STATEMENT,
            &[kw("writel"), kw("("), ID_LIST1, kw(")")],
        ),
        GrammarRule::new(
            UNLABELED_STATEMENT,
            &[
                kw("do"),
                ID,
                kw("="),
                EXPRESSION1,
                kw("to"),
                EXPRESSION2,
                STATEMENT_LIST1,
                kw("next"),
            ],
        ),
        GrammarRule::new(
            UNLABELED_STATEMENT,
            &[kw("if"), LOGICAL_EXPRESSION1, kw("then"), kw("goto"), LABEL],
        ),
        // identifier lists carry a leading comma; a bare `IdList -> id`
        // would collide with `Mult -> id`
        GrammarRule::new(ID_LIST1, &[ID_LIST]),
        GrammarRule::new(ID_LIST, &[kw(","), ID]),
        GrammarRule::new(ID_LIST, &[ID_LIST, kw(","), ID]),
        GrammarRule::new(PROGRAM_NAME, &[kw("program"), ID]),
        // arithmetic
        GrammarRule::new(EXPRESSION, &[TERM1]),
        GrammarRule::new(EXPRESSION1, &[EXPRESSION]),
        GrammarRule::new(EXPRESSION2, &[EXPRESSION1]),
        GrammarRule::new(EXPRESSION, &[EXPRESSION, kw("+"), TERM1]).with_emit(emit_operator),
        GrammarRule::new(EXPRESSION, &[EXPRESSION, kw("-"), TERM1]).with_emit(emit_operator),
        GrammarRule::new(EXPRESSION, &[kw("-"), TERM1]).with_emit(emit_negation),
        GrammarRule::new(TERM1, &[TERM]),
        GrammarRule::new(TERM, &[MULT]),
        GrammarRule::new(TERM, &[TERM, kw("*"), MULT]).with_emit(emit_operator),
        GrammarRule::new(TERM, &[TERM, kw("/"), MULT]).with_emit(emit_operator),
        GrammarRule::new(MULT, &[kw("("), EXPRESSION1, kw(")")]),
        GrammarRule::new(MULT, &[ID]).with_emit(emit_operand),
        GrammarRule::new(MULT, &[CONST]).with_emit(emit_operand),
        // logic
        GrammarRule::new(LOGICAL_EXPRESSION1, &[LOGICAL_EXPRESSION]),
        GrammarRule::new(LOGICAL_EXPRESSION, &[LOGICAL_TERM1]),
        GrammarRule::new(LOGICAL_EXPRESSION, &[LOGICAL_EXPRESSION, kw("or"), LOGICAL_TERM1])
            .with_emit(emit_operator),
        GrammarRule::new(LOGICAL_TERM, &[LOGICAL_MULT]),
        GrammarRule::new(LOGICAL_TERM1, &[LOGICAL_TERM]),
        GrammarRule::new(LOGICAL_TERM, &[LOGICAL_TERM, kw("and"), LOGICAL_MULT])
            .with_emit(emit_operator),
        GrammarRule::new(LOGICAL_MULT, &[RELATION]),
        GrammarRule::new(LOGICAL_MULT, &[kw("["), LOGICAL_EXPRESSION1, kw("]")]),
        GrammarRule::new(LOGICAL_MULT, &[kw("!"), LOGICAL_MULT]).with_emit(emit_not),
    ];

    for op in RELATIONAL_OPERATORS {
        rules.push(
            GrammarRule::new(RELATION, &[EXPRESSION1, kw(op), EXPRESSION1])
                .with_emit(emit_operator),
        );
    }

    Grammar::new(PROGRAM, rules)
}

fn emit_operand(popped: &[Token], out: &mut Program) {
    match popped.first().map(|t| &t.kind) {
        Some(TokenKind::Identifier(name)) => out.push_ident(name),
        Some(TokenKind::Constant(value)) => out.push_constant(*value),
        _ => {}
    }
}

/// Binary rules: the operator sits in the middle of the base.
fn emit_operator(popped: &[Token], out: &mut Program) {
    if let Some(op) = popped
        .get(1)
        .and_then(|t| t.keyword_text())
        .and_then(Op::from_operator)
    {
        out.push(op);
    }
}

fn emit_negation(_: &[Token], out: &mut Program) {
    out.push(Op::Neg);
}

fn emit_not(_: &[Token], out: &mut Program) {
    out.push(Op::Not);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axiom_is_program() {
        let grammar = build_grammar();
        assert_eq!(grammar.axiom, PROGRAM);
        assert_eq!(grammar.rules[0].lhs, PROGRAM);
    }

    #[test]
    fn test_one_relation_rule_per_operator() {
        let grammar = build_grammar();
        assert_eq!(grammar.productions(RELATION).count(), 6);
    }

    #[test]
    fn test_find_rule_takes_first_match() {
        let grammar = build_grammar();
        let rule = grammar.find_rule(&[ID]).unwrap();
        assert_eq!(rule.lhs, MULT);
        assert!(rule.emit.is_some());

        assert!(grammar.find_rule(&[kw("("), EXPRESSION1]).is_none());
    }

    #[test]
    fn test_classify() {
        let grammar = build_grammar();
        assert_eq!(grammar.classify(&Token::identifier("a", 1)), Some(ID));
        assert_eq!(grammar.classify(&Token::constant(1.0, 1)), Some(CONST));
        assert_eq!(grammar.classify(&Token::newline(1)), Some(NL));
        assert_eq!(grammar.classify(&Token::keyword("<=", 1)), Some(kw("<=")));
        assert_eq!(grammar.classify(&Token::keyword("%", 1)), None);
    }

    #[test]
    fn test_terminals_are_unique() {
        let grammar = build_grammar();
        let terminals = grammar.terminals();
        for (i, t) in terminals.iter().enumerate() {
            assert!(!terminals[i + 1..].contains(t), "duplicate terminal {}", t);
        }
        assert!(terminals.contains(&LABEL));
    }

    #[test]
    fn test_emit_callbacks() {
        let grammar = build_grammar();
        let mut out = Program::new();

        let mult_id = grammar.find_rule(&[ID]).unwrap();
        (mult_id.emit.unwrap())(&[Token::identifier("a", 1)], &mut out);

        let mult_const = grammar.find_rule(&[CONST]).unwrap();
        (mult_const.emit.unwrap())(&[Token::constant(2.0, 1)], &mut out);

        let add = grammar.find_rule(&[EXPRESSION, kw("+"), TERM1]).unwrap();
        (add.emit.unwrap())(
            &[
                Token::nonterminal("Expression"),
                Token::keyword("+", 1),
                Token::nonterminal("Term1"),
            ],
            &mut out,
        );

        let neg = grammar.find_rule(&[kw("-"), TERM1]).unwrap();
        (neg.emit.unwrap())(&[Token::keyword("-", 1), Token::nonterminal("Term1")], &mut out);

        assert_eq!(out.to_string(), "a 2 + @");
    }

    #[test]
    fn test_rhs_token() {
        let grammar = build_grammar();
        let rule = grammar.find_rule(&[TERM, kw("*"), MULT]).unwrap();
        assert_eq!(rule.rhs_token().to_string(), "<Term> * <Mult>");
    }
}
