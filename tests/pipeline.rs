use prn::frontend::checker::CheckerKind;
use prn::frontend::parser::ParserConfig;
use prn::frontend::parser_error::ParserError;
use prn::frontend::validate::Severity;
use prn::postfix::Program;
use prn::runtime::{ExecutorConfig, VariableStore};
use prn::runtime::runtime_error::RuntimeError;
use prn::{Error, Outcome, compile, compile_with, evaluate, execute, run_source};

use proptest::prelude::*;

// ============================================================
// Helpers
// ============================================================

fn source(vars: &str, body: &str) -> String {
    format!("program test\nvar {} : float\nbegin\n{}\nend", vars, body)
}

fn run(vars: &str, body: &str, input: &str) -> (Outcome, String) {
    let src = source(vars, body);
    match run_source(&src, input) {
        Ok(result) => result,
        Err(e) => panic!("program failed: {}\n{}", e, src),
    }
}

fn postfix(vars: &str, body: &str) -> String {
    compile(&source(vars, body))
        .expect("compile should succeed")
        .program
        .to_string()
}

fn assert_store(outcome: &Outcome, expected: &[(&str, f32)]) {
    for (name, value) in expected {
        let actual = outcome
            .store
            .get(name)
            .unwrap_or_else(|| panic!("'{}' missing from store:\n{}", name, outcome.store));
        assert!(
            (actual - value).abs() < 1e-5,
            "{} = {}, expected {}",
            name,
            actual,
            value
        );
    }
}

fn run_limited(vars: &str, body: &str, max_steps: usize) -> Result<Outcome, Error> {
    let compiled = compile(&source(vars, body))?;
    execute(
        &compiled.program,
        ExecutorConfig {
            max_steps: Some(max_steps),
        },
        &mut "".as_bytes(),
        &mut std::io::sink(),
    )
}

// ============================================================
// Scenarios
// ============================================================

#[test]
fn bracketed_arithmetic() {
    let body = "a = (2 + 8) * ((3 + 4) / 2)";
    assert_eq!(postfix(",a", body), "a 2 8 + 3 4 + 2 / * =");

    let (outcome, _) = run(",a", body, "");
    assert_store(&outcome, &[("a", 35.0)]);
}

#[test]
fn unary_negation() {
    let body = "a = 1\nb = -a";
    assert_eq!(postfix(",a,b", body), "a 1 = b a @ =");

    let (outcome, _) = run(",a,b", body, "");
    assert_store(&outcome, &[("a", 1.0), ("b", -1.0)]);
}

#[test]
fn conditional_goto() {
    let body = "m: if a == 1 then goto m";
    assert_eq!(
        postfix(",a", body),
        "m : a 1 == _m1 CondFalse m Uncond _m1 :"
    );

    // a = 0: the conditional jump is taken and the program ends
    let outcome = run_limited(",a", body, 100).expect("should terminate");
    assert_store(&outcome, &[("a", 0.0)]);

    // a = 1: falls through to the jump back to m, forever
    let err = run_limited(",a", &format!("a = 1\n{}", body), 100).unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::StepLimit(100))));
}

#[test]
fn counted_loop() {
    let (outcome, _) = run(",i,sum", "do i = 1 to 5\nsum = sum + i\nnext", "");
    assert_store(&outcome, &[("i", 6.0), ("sum", 15.0)]);
}

#[test]
fn write_output() {
    let (_, out) = run(",a", "a = 5\nwritel(,a)", "");
    assert_eq!(out, "a = 5");
}

#[test]
fn read_input() {
    let (outcome, _) = run(",a", "readl(,a)", "5\n");
    assert_store(&outcome, &[("a", 5.0)]);
}

#[test]
fn read_rejects_non_numeric_input() {
    let err = run_source(&source(",a", "readl(,a)"), "five\n").unwrap_err();
    assert!(
        matches!(&err, Error::Runtime(RuntimeError::InvalidInput { name, .. }) if name == "a"),
        "{}",
        err
    );
}

// ============================================================
// Programs
// ============================================================

#[test]
fn nested_loops() {
    let (outcome, out) = run(
        ",i,j,s",
        "do i = 1 to 3\ndo j = 1 to i * 2\ns = s + j\nnext\nnext\nwritel(,s)",
        "",
    );
    assert_store(&outcome, &[("s", 34.0), ("i", 4.0), ("j", 7.0)]);
    assert_eq!(out, "s = 34");
}

#[test]
fn backward_goto_loop() {
    let (outcome, _) = run(",a", "a = 10\nm: a = a - 3\nif a > 0 then goto m", "");
    assert_store(&outcome, &[("a", -2.0)]);
}

#[test]
fn arithmetic_precedence() {
    let (outcome, _) = run(",a,b", "a = -(1 + 2) * 3 - 4\nb = 2 * (3 - 1) - 4 / 2", "");
    assert_store(&outcome, &[("a", -13.0), ("b", 2.0)]);
}

#[test]
fn logical_condition() {
    let body = "a = 1\nm: a = a + 1\nif [a == 2 or a == 3] and ![a > 9] then goto m";
    let (outcome, _) = run(",a", body, "");
    assert_store(&outcome, &[("a", 4.0)]);
}

#[test]
fn write_inside_loop() {
    let (_, out) = run(",i", "do i = 1 to 3\nwritel(,i)\nnext", "");
    assert_eq!(out, "i = 1i = 2i = 3");
}

#[test]
fn empty_loop_range() {
    let (outcome, _) = run(",i,s", "do i = 1 to 0\ns = s + 1\nnext", "");
    assert_store(&outcome, &[("i", 1.0), ("s", 0.0)]);
}

#[test]
fn read_then_write() {
    let (outcome, out) = run(",a,b", "readl(,a,b)\nwritel(,a,b)", "5\n7\n");
    assert_store(&outcome, &[("a", 5.0), ("b", 7.0)]);
    assert_eq!(out, "a = 5b = 7");
}

#[test]
fn statements_leave_no_result() {
    let (outcome, _) = run(",a", "a = 1", "");
    assert_eq!(outcome.result, None);
    assert!(outcome.steps > 0);
}

#[test]
fn bare_expression_evaluates_against_store() {
    let mut store = VariableStore::new();
    store.set("a", 4.0);

    let value = evaluate("(2 + 8) * ((3 + a) / 2)", &mut store).unwrap();
    assert_eq!(value, Some(35.0));

    assert_eq!(evaluate("a > 3 and ![a == 0]", &mut store).unwrap(), Some(1.0));
    assert_eq!(evaluate("-a", &mut store).unwrap(), Some(-4.0));
}

#[test]
fn bare_assignment_updates_store() {
    let mut store = VariableStore::new();
    store.set("a", 1.0);

    assert_eq!(evaluate("a = a * 10 - 3", &mut store).unwrap(), None);
    assert_eq!(store.get("a"), Some(7.0));
}

#[test]
fn bare_expression_with_unknown_variable_fails() {
    let err = evaluate("b + 1", &mut VariableStore::new()).unwrap_err();
    assert!(
        matches!(&err, Error::Runtime(RuntimeError::UndefinedVariable { name }) if name == "b"),
        "{}",
        err
    );
}

// ============================================================
// Errors and diagnostics
// ============================================================

#[test]
fn lexer_error_is_tagged() {
    let err = compile(&source(",a", "a = 1 $ 2")).unwrap_err();
    assert!(matches!(err, Error::Lexer(_)));
    assert!(err.to_string().starts_with("Lexer error: 4:"), "{}", err);
}

#[test]
fn syntax_error_carries_line() {
    let err = compile(&source(",a", "a = 1\na = * 2")).unwrap_err();
    match err {
        Error::Parser(e) => assert_eq!(e.line(), 5),
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn io_lists_without_leading_comma_are_rejected() {
    for body in ["writel(a)", "readl(a)"] {
        let err = compile(&source(",a", body)).unwrap_err();
        assert!(matches!(err, Error::Parser(_)), "{}: {}", body, err);
    }
}

#[test]
fn every_checker_compiles_the_same_program() {
    let src = source(",i,s", "do i = 1 to 4\ns = s + i * i\nnext\nwritel(,s)");
    let reference = compile(&src).unwrap().program;

    for checker in CheckerKind::ALL {
        let config = ParserConfig {
            checker,
            ..Default::default()
        };
        let compiled = compile_with(&src, config).unwrap();
        assert_eq!(compiled.program, reference, "{}", checker);
    }
}

#[test]
fn chosen_checker_reports_the_syntax_error() {
    let src = source(",a", "a = 1\nif a then goto m");
    for checker in [CheckerKind::Recursive, CheckerKind::StateMachine] {
        let config = ParserConfig {
            checker,
            ..Default::default()
        };
        match compile_with(&src, config).unwrap_err() {
            Error::Parser(ParserError::Expected { expected, line, .. }) => {
                assert_eq!(expected, "relational operator", "{}", checker);
                assert_eq!(line, 5);
            }
            other => panic!("{}: unexpected error {}", checker, other),
        }
    }
}

#[test]
fn undefined_label_is_reported_then_fails_at_run_time() {
    let src = source(",a", "if a == 0 then goto nowhere");
    let compiled = compile(&src).expect("diagnostics do not stop compilation");

    assert!(
        compiled
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("nowhere"))
    );

    let err = run_source(&src, "").unwrap_err();
    assert!(matches!(err, Error::Runtime(RuntimeError::UndefinedLabel { .. })));
}

#[test]
fn binary_program_runs_like_source() {
    let src = source(",i,s", "do i = 1 to 4\ns = s + i * i\nnext");
    let compiled = compile(&src).unwrap();

    let bytes = compiled.program.to_bytes().unwrap();
    let loaded = Program::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, compiled.program);

    let outcome = execute(
        &loaded,
        ExecutorConfig::default(),
        &mut "".as_bytes(),
        &mut std::io::sink(),
    )
    .unwrap();
    assert_store(&outcome, &[("s", 30.0)]);
}

// ============================================================
// Properties
// ============================================================

#[derive(Debug, Clone)]
enum Expr {
    Num(u8),
    Var(u8),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
}

fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![(0u8..20).prop_map(Expr::Num), (0u8..8).prop_map(Expr::Var)];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Neg(Box::new(e))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::Sub(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::Mul(Box::new(a), Box::new(b))),
        ]
    })
}

/// Statement `k` may read only the variables assigned before it; with none
/// available a variable leaf stands for its number.
fn render(e: &Expr, k: usize) -> String {
    match e {
        Expr::Num(n) => n.to_string(),
        Expr::Var(n) if k == 0 => n.to_string(),
        Expr::Var(n) => format!("v{}", *n as usize % k),
        Expr::Neg(a) => format!("(-{})", render(a, k)),
        Expr::Add(a, b) => format!("({} + {})", render(a, k), render(b, k)),
        Expr::Sub(a, b) => format!("({} - {})", render(a, k), render(b, k)),
        Expr::Mul(a, b) => format!("({} * {})", render(a, k), render(b, k)),
    }
}

fn eval(e: &Expr, env: &[f32]) -> f32 {
    match e {
        Expr::Num(n) => *n as f32,
        Expr::Var(n) if env.is_empty() => *n as f32,
        Expr::Var(n) => env[*n as usize % env.len()],
        Expr::Neg(a) => -eval(a, env),
        Expr::Add(a, b) => eval(a, env) + eval(b, env),
        Expr::Sub(a, b) => eval(a, env) - eval(b, env),
        Expr::Mul(a, b) => eval(a, env) * eval(b, env),
    }
}

fn straight_line(exprs: &[Expr]) -> String {
    let vars: String = (0..exprs.len()).map(|k| format!(",v{}", k)).collect();
    let body: Vec<String> = exprs
        .iter()
        .enumerate()
        .map(|(k, e)| format!("v{} = {}", k, render(e, k)))
        .collect();
    source(&vars, &body.join("\n"))
}

proptest! {
    #[test]
    fn straight_line_matches_direct_evaluation(exprs in prop::collection::vec(expr(), 1..6)) {
        let src = straight_line(&exprs);
        let (outcome, _) = run_source(&src, "").map_err(|e| TestCaseError::fail(format!("{}\n{}", e, src)))?;

        let mut env = Vec::new();
        for (k, e) in exprs.iter().enumerate() {
            let expected = eval(e, &env);
            env.push(expected);
            let actual = outcome.store.get(&format!("v{}", k));
            // deep products may overflow to inf and then NaN on both sides
            let same = actual.is_some_and(|a| a == expected || (a.is_nan() && expected.is_nan()));
            prop_assert!(same, "v{} = {:?}, expected {}\n{}", k, actual, expected, src);
        }
    }

    #[test]
    fn every_checker_accepts_generated_programs(exprs in prop::collection::vec(expr(), 1..5)) {
        let src = straight_line(&exprs);
        for checker in CheckerKind::ALL {
            let config = ParserConfig { checker, ..Default::default() };
            let result = compile_with(&src, config);
            prop_assert!(result.is_ok(), "{} checker: {:?}\n{}", checker, result.err(), src);
        }
    }

    #[test]
    fn compose_is_deterministic(exprs in prop::collection::vec(expr(), 1..4), bound in 1u8..5) {
        let mut src = straight_line(&exprs);
        // wrap the statements in a loop so labels and bounds get allocated
        src = src.replacen("begin\n", &format!("begin\ndo i = 1 to {}\n", bound), 1);
        src = src.replacen("\nend", "\nnext\nend", 1);
        src = src.replacen(" : float", ",i : float", 1);

        let first = compile(&src).map_err(|e| TestCaseError::fail(format!("{}\n{}", e, src)))?;
        let second = compile(&src).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&first.program, &second.program);
        prop_assert_eq!(first.program.to_string(), second.program.to_string());
    }
}
