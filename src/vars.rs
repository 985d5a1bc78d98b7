//! Per-test-case variable storage and argument expansion.

use std::collections::HashMap;

use crate::ast::Argument;
use crate::error::ExecutionError;

/// Mapping from bare variable name (no `@`) to string value. Scoped to a
/// single test case: created empty on entry, discarded on exit.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: HashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    /// Resolves an [`Argument`] to its string value at the given source
    /// line, for diagnostics on failure.
    pub fn expand(&self, argument: &Argument, line: usize) -> Result<String, ExecutionError> {
        match argument {
            Argument::Literal(s) => Ok(s.clone()),
            Argument::VarRef(name) => {
                self.get(name)
                    .map(str::to_string)
                    .ok_or_else(|| ExecutionError::UndefinedVariable {
                        line,
                        name: name.clone(),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut store = VariableStore::new();
        store.set("x", "hi");
        assert_eq!(store.get("x"), Some("hi"));
    }

    #[test]
    fn overwrite_replaces_value() {
        let mut store = VariableStore::new();
        store.set("x", "a");
        store.set("x", "b");
        assert_eq!(store.get("x"), Some("b"));
    }

    #[test]
    fn expand_literal_is_passthrough() {
        let store = VariableStore::new();
        let value = store.expand(&Argument::Literal("hi".into()), 1).unwrap();
        assert_eq!(value, "hi");
    }

    #[test]
    fn expand_undefined_var_is_execution_error() {
        let store = VariableStore::new();
        let err = store.expand(&Argument::VarRef("missing".into()), 7).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::UndefinedVariable { line: 7, .. }
        ));
    }
}
