use std::fmt;

use crate::frontend::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Advisory finding about names in a program. Never stops compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.severity, self.message)
    }
}

#[derive(Default)]
struct Names {
    declared: Vec<(String, usize)>,
    used: Vec<(String, usize)>,
    defined: Vec<(String, usize)>,
    targeted: Vec<(String, usize)>,
}

fn first<'a>(list: &'a [(String, usize)], name: &str) -> Option<&'a (String, usize)> {
    list.iter().find(|(n, _)| n == name)
}

fn collect(tokens: &[Token]) -> Names {
    let mut names = Names::default();
    let mut in_var = false;
    let mut in_body = false;

    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Keyword(k) if k == "var" => in_var = true,
            TokenKind::Keyword(k) if k == "begin" => {
                in_var = false;
                in_body = true;
            }
            TokenKind::Keyword(k) if k == "end" => in_body = false,
            TokenKind::Identifier(name) if in_var => {
                names.declared.push((name.clone(), token.line));
            }
            TokenKind::Identifier(name) if in_body => {
                names.used.push((name.clone(), token.line));
            }
            TokenKind::Label(name) if in_body => {
                if tokens.get(i + 1).is_some_and(|t| t.is_keyword(":")) {
                    names.defined.push((name.clone(), token.line));
                }
                if i > 0 && tokens[i - 1].is_keyword("goto") {
                    names.targeted.push((name.clone(), token.line));
                }
            }
            _ => {}
        }
    }

    names
}

/// Checks declarations against uses and label definitions against jumps.
pub fn validate(tokens: &[Token]) -> Vec<Diagnostic> {
    let names = collect(tokens);
    let mut diagnostics = Vec::new();

    for (name, line) in &names.declared {
        if first(&names.used, name).is_none() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!("variable '{}' is declared but never used", name),
                line: *line,
            });
        }
    }

    let mut reported: Vec<&str> = Vec::new();
    for (name, line) in &names.used {
        if first(&names.declared, name).is_none() && !reported.contains(&name.as_str()) {
            reported.push(name);
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: format!("variable '{}' is used but not declared", name),
                line: *line,
            });
        }
    }

    for (i, (name, line)) in names.defined.iter().enumerate() {
        if first(&names.defined[..i], name).is_some() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!("label '{}' is defined again; jumps use the first definition", name),
                line: *line,
            });
        } else if first(&names.targeted, name).is_none() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!("label '{}' is never a jump target", name),
                line: *line,
            });
        }
    }

    let mut reported: Vec<&str> = Vec::new();
    for (name, line) in &names.targeted {
        if first(&names.defined, name).is_none() && !reported.contains(&name.as_str()) {
            reported.push(name);
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: format!("jump to undefined label '{}'", name),
                line: *line,
            });
        }
    }

    diagnostics.sort_by_key(|d| d.line);
    for d in &diagnostics {
        match d.severity {
            Severity::Warning => log::warn!("{}", d),
            Severity::Error => log::error!("{}", d),
        }
    }

    diagnostics
}
