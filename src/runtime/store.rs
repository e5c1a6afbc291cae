use std::collections::BTreeMap;
use std::fmt;

use crate::postfix::Program;

/// Current value of every variable, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: BTreeMap<String, f32>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Registers `name` with value 0 unless it already has a value.
    pub fn declare(&mut self, name: &str) {
        self.values.entry(name.to_string()).or_insert(0.0);
    }

    /// Declares every identifier the program mentions.
    pub fn prepare(&mut self, program: &Program) {
        for name in program.identifiers() {
            self.declare(name);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl fmt::Display for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{} = {}", name, value)?;
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, f32)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (&'a str, f32)>>(iter: I) -> Self {
        let mut store = VariableStore::new();
        for (name, value) in iter {
            store.set(name, value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postfix::Op;

    #[test]
    fn test_declare_keeps_existing_value() {
        let mut store = VariableStore::new();
        store.set("a", 5.0);
        store.declare("a");
        store.declare("b");

        assert_eq!(store.get("a"), Some(5.0));
        assert_eq!(store.get("b"), Some(0.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_prepare_registers_program_identifiers() {
        let mut program = Program::new();
        program.push_ident("x");
        program.push_constant(1.0);
        program.push(Op::Assign);
        program.push_ident("y");
        program.push(Op::Write);

        let mut store = VariableStore::new();
        store.prepare(&program);

        assert!(store.contains("x"));
        assert!(store.contains("y"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_display_is_sorted_by_name() {
        let store: VariableStore = [("b", 2.0), ("a", 1.5)].into_iter().collect();
        assert_eq!(store.to_string(), "a = 1.5\nb = 2\n");
    }
}
