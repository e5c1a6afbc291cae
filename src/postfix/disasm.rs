use std::collections::BTreeMap;

use crate::postfix::{Op, Program};
use crate::runtime::executor::link;

/// Print disassembly of a postfix program
pub fn print_program(program: &Program) {
    println!("════════════════════════════════════════");
    println!(" postfix");
    println!(" {} instructions", program.len());
    println!(
        " {} constants, {} labels",
        program.constants.len(),
        program.labels.len()
    );
    println!("════════════════════════════════════════");
    print!("{}", disassemble_to_string(program));
    println!();
}

// =============================================================================
// String output (for testing/logging)
// =============================================================================

/// Return disassembly as a String
pub fn disassemble_to_string(program: &Program) -> String {
    let mut output = String::new();
    let targets = link(program);
    let jump_targets: Vec<usize> = targets.iter().flatten().copied().collect();

    for (ip, op) in program.ops.iter().enumerate() {
        if jump_targets.contains(&ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!("{:04} ", ip));

        if jump_targets.contains(&ip) {
            output.push_str("► ");
        } else {
            output.push_str("  ");
        }

        let defines = matches!(op, Op::Label(_)) && program.ops.get(ip + 1) == Some(&Op::Mark);
        output.push_str(&format_op_string(program, op, defines, &targets));
        output.push('\n');
    }

    // a label defined as the very last op jumps past the end
    if jump_targets.contains(&program.len()) {
        output.push_str("      ┌──────────────────────────────────\n");
        output.push_str(&format!("{:04} ► END\n", program.len()));
    }

    output
}

fn format_op_string(program: &Program, op: &Op, defines: bool, targets: &[Option<usize>]) -> String {
    match op {
        Op::Ident(name) => format!("IDENT       {}", name),
        Op::Const(slot) => match program.constant(*slot) {
            Some(value) => format!("CONST       {}", value),
            None => format!("CONST       c{} (missing)", slot),
        },
        Op::Label(slot) => {
            let name = program.label_name(*slot).unwrap_or("?");
            if defines {
                format!("DEF_LABEL   {}", name)
            } else {
                match targets.get(*slot).copied().flatten() {
                    Some(target) => format!("LABEL       {} (→ {:04})", name, target),
                    None => format!("LABEL       {} (undefined)", name),
                }
            }
        }
        Op::JumpIfFalse => "JUMP_FALSE  ; ( cond label -- )".to_string(),
        Op::Jump => "JUMP        ; ( label -- )".to_string(),
        Op::Assign => "ASSIGN      ; ( name value -- )".to_string(),
        Op::Read => "READ        ; ( name -- )".to_string(),
        Op::Write => "WRITE       ; ( name -- )".to_string(),
        other => op_name(other).to_string(),
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Print postfix statistics
pub fn print_stats(program: &Program) {
    println!("=== POSTFIX STATISTICS ===\n");

    println!("Instructions:     {}", program.len());
    println!("Constants:        {}", program.constants.len());
    println!("Labels:           {}", program.labels.len());
    println!("Identifiers:      {}", program.identifiers().len());
    println!();

    let counts = count_ops(&program.ops);
    let mut counts: Vec<_> = counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1));

    println!("Op frequency:");
    for (op, count) in counts.iter().take(10) {
        let pct = (**count as f64 / program.len().max(1) as f64) * 100.0;
        println!("  {:<14} {:>4} ({:>5.1}%)", op, count, pct);
    }
}

fn count_ops(ops: &[Op]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for op in ops {
        *counts.entry(op_name(op)).or_insert(0) += 1;
    }
    counts
}

fn op_name(op: &Op) -> &'static str {
    match op {
        Op::Ident(_) => "IDENT",
        Op::Const(_) => "CONST",
        Op::Label(_) => "LABEL",
        Op::Mark => "MARK",
        Op::Assign => "ASSIGN",
        Op::Add => "ADD",
        Op::Sub => "SUB",
        Op::Mul => "MUL",
        Op::Div => "DIV",
        Op::Neg => "NEG",
        Op::Eq => "EQ",
        Op::Ne => "NE",
        Op::Lt => "LT",
        Op::Gt => "GT",
        Op::Le => "LE",
        Op::Ge => "GE",
        Op::And => "AND",
        Op::Or => "OR",
        Op::Not => "NOT",
        Op::JumpIfFalse => "JUMP_FALSE",
        Op::Jump => "JUMP",
        Op::Read => "READ",
        Op::Write => "WRITE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // m : a 1 == _m1 CondFalse m Uncond _m1 :
    fn conditional_loop() -> Program {
        let mut program = Program::new();
        program.push_label("m");
        program.push(Op::Mark);
        program.push_ident("a");
        program.push_constant(1.0);
        program.push(Op::Eq);
        program.push_label("_m1");
        program.push(Op::JumpIfFalse);
        program.push_label("m");
        program.push(Op::Jump);
        program.push_label("_m1");
        program.push(Op::Mark);
        program
    }

    #[test]
    fn test_jump_targets_marked() {
        let output = disassemble_to_string(&conditional_loop());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "0000   DEF_LABEL   m");
        assert_eq!(lines[2], "      ┌──────────────────────────────────");
        assert_eq!(lines[3], "0002 ► IDENT       a");
        assert!(output.contains("LABEL       _m1 (→ 0011)"));
        assert!(output.contains("LABEL       m (→ 0002)"));
        assert!(output.ends_with("0011 ► END\n"));
    }

    #[test]
    fn test_undefined_label_shown() {
        let mut program = Program::new();
        program.push_label("nowhere");
        program.push(Op::Jump);

        let output = disassemble_to_string(&program);
        assert!(output.contains("LABEL       nowhere (undefined)"));
        assert!(!output.contains('►'));
    }

    #[test]
    fn test_op_counts() {
        let counts = count_ops(&conditional_loop().ops);

        assert_eq!(counts.get("LABEL"), Some(&4));
        assert_eq!(counts.get("MARK"), Some(&2));
        assert_eq!(counts.get("EQ"), Some(&1));
        assert_eq!(counts.get("JUMP"), Some(&1));
    }
}
