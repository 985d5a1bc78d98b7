//! The parsed representation of a `.spec` file: statements, arguments,
//! test cases and snippets. Nothing in this module touches the filesystem
//! or spawns processes; it is pure data produced by [`crate::parser`].

use std::collections::HashMap;

use serde::Serialize;

/// Whether a `.`/`!` suffixed statement expects success or failure/falsity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Flips the boolean outcome of a predicate according to this polarity.
    pub fn apply(self, predicate_true: bool) -> bool {
        match self {
            Polarity::Positive => predicate_true,
            Polarity::Negative => !predicate_true,
        }
    }
}

/// The operator-specific verb of a Shell statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShellVerb {
    Run,
    Expect,
    Send,
}

/// A single argument token, already unescaped, not yet variable-expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Argument {
    Literal(String),
    VarRef(String),
}

impl Argument {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Argument::Literal(s) => Some(s),
            Argument::VarRef(_) => None,
        }
    }
}

/// The kind-specific payload of a statement.
#[derive(Debug, Clone, Serialize)]
pub enum StatementKind {
    /// A `$.`/`$!` run statement, carrying its attached `$<`/`$>` script
    /// (empty for batch mode).
    Shell {
        verb: ShellVerb,
        script: Vec<Statement>,
    },
    /// A `?.`/`?!` assertion. `target` is the first argument (e.g. `stdout`,
    /// `file`, `==`); `arguments` holds the remainder.
    Assertion { target: String },
    /// A `:.` action. `target` is the first argument (e.g. `stdout`, `file`,
    /// `@`); `arguments` holds the remainder.
    Action { target: String },
}

/// One non-blank, non-comment line of a spec file, plus any attached
/// content block.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub polarity: Polarity,
    pub arguments: Vec<Argument>,
    pub content_block: Option<Vec<String>>,
    pub source_line: usize,
}

impl Statement {
    /// Arguments after the target (for Assertion/Action) or all arguments
    /// (for Shell, where there is no target).
    pub fn tail_arguments(&self) -> &[Argument] {
        match &self.kind {
            StatementKind::Shell { .. } => &self.arguments,
            StatementKind::Assertion { .. } | StatementKind::Action { .. } => {
                if self.arguments.is_empty() {
                    &[]
                } else {
                    &self.arguments[1..]
                }
            }
        }
    }
}

/// A named, isolated sequence of statements sharing a variable store and a
/// working directory.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub name: String,
    pub statements: Vec<Statement>,
    pub source_line: usize,
}

/// A named, reusable sequence of statements expanded inline at invocation
/// sites.
#[derive(Debug, Clone, Serialize)]
pub struct Snippet {
    pub name: String,
    pub statements: Vec<Statement>,
    pub source_line: usize,
}

/// The full parse of one `.spec` file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpecDocument {
    pub tests: Vec<TestCase>,
    pub snippets: HashMap<String, Snippet>,
}
