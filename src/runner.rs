//! Orchestrates the whole run: provisions a fresh temporary working
//! directory per test case, walks its statements (expanding snippet
//! invocations inline), and accumulates a [`RunReport`].

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::info;
use tracing::warn;

use crate::action;
use crate::assert;
use crate::ast::Argument;
use crate::ast::Snippet;
use crate::ast::StatementKind;
use crate::ast::TestCase;
use crate::config::AliasTable;
use crate::config::RunnerConfig;
use crate::error::ExecutionError;
use crate::error::StepError;
use crate::process::ProcessResult;
use crate::shell;
use crate::vars::VariableStore;
use crate::SpecDocument;

/// Selects which test cases to run, mirroring the CLI's `--test` flag.
#[derive(Debug, Clone)]
pub enum TestSelector {
    /// 1-based index into the document's test list.
    Index(usize),
    /// Case-sensitive substring match against test names.
    Name(String),
}

impl TestSelector {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => TestSelector::Index(n),
            _ => TestSelector::Name(raw.to_string()),
        }
    }

    fn matches(&self, index: usize, test: &TestCase) -> bool {
        match self {
            TestSelector::Index(n) => *n == index + 1,
            TestSelector::Name(needle) => test.name.contains(needle.as_str()),
        }
    }
}

/// A single captured process result, kept for `--verbose` reporting.
#[derive(Debug, Clone)]
pub struct VerboseEntry {
    pub source_line: usize,
    pub result: ProcessResult,
}

/// The pass/fail outcome of one test case.
#[derive(Debug)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    pub diagnostic: Option<String>,
    pub verbose_log: Vec<VerboseEntry>,
}

/// The result of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Drives a parsed [`SpecDocument`] to completion.
pub struct Runner {
    doc: SpecDocument,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(doc: SpecDocument, config: RunnerConfig) -> Self {
        Self { doc, config }
    }

    /// Runs every test case matching `selector` (or all of them, if
    /// `None`), in source order.
    pub fn run(&self, selector: Option<&TestSelector>) -> RunReport {
        let mut report = RunReport::default();
        for (index, test) in self.doc.tests.iter().enumerate() {
            if let Some(selector) = selector {
                if !selector.matches(index, test) {
                    continue;
                }
            }
            report.outcomes.push(self.run_one(test));
        }
        report
    }

    fn run_one(&self, test: &TestCase) -> TestOutcome {
        let tempdir = match TempDir::new() {
            Ok(dir) => dir,
            Err(source) => {
                return TestOutcome {
                    name: test.name.clone(),
                    passed: false,
                    diagnostic: Some(format!("could not create temporary directory: {source}")),
                    verbose_log: Vec::new(),
                };
            }
        };
        let cwd = dunce::canonicalize(tempdir.path()).unwrap_or_else(|_| tempdir.path().to_path_buf());

        let mut ctx = ExecContext {
            vars: VariableStore::new(),
            last_result: None,
            cwd,
            aliases: &self.config.alias_table,
            config: &self.config,
            snippets: &self.doc.snippets,
            active_snippets: Vec::new(),
            verbose_log: Vec::new(),
        };

        info!(test = test.name.as_str(), "running test case");
        let outcome = match execute_statements(&test.statements, &mut ctx) {
            Ok(()) => TestOutcome {
                name: test.name.clone(),
                passed: true,
                diagnostic: None,
                verbose_log: ctx.verbose_log,
            },
            Err(err) => {
                warn!(test = test.name.as_str(), error = %err, "test failed");
                TestOutcome {
                    name: test.name.clone(),
                    passed: false,
                    diagnostic: Some(err.to_string()),
                    verbose_log: ctx.verbose_log,
                }
            }
        };

        drop(tempdir);
        outcome
    }
}

/// Per-test-case execution state threaded through statement dispatch and
/// snippet expansion.
struct ExecContext<'a> {
    vars: VariableStore,
    last_result: Option<ProcessResult>,
    cwd: PathBuf,
    aliases: &'a AliasTable,
    config: &'a RunnerConfig,
    snippets: &'a HashMap<String, Snippet>,
    active_snippets: Vec<String>,
    verbose_log: Vec<VerboseEntry>,
}

fn execute_statements(statements: &[crate::ast::Statement], ctx: &mut ExecContext<'_>) -> Result<(), StepError> {
    for statement in statements {
        match &statement.kind {
            StatementKind::Shell { verb: crate::ast::ShellVerb::Run, .. } => {
                let result = shell::execute(statement, &ctx.vars, ctx.aliases, &ctx.cwd, ctx.config)?;
                if ctx.config.verbose {
                    ctx.verbose_log.push(VerboseEntry {
                        source_line: statement.source_line,
                        result: result.clone(),
                    });
                }
                ctx.last_result = Some(result);
            }
            StatementKind::Shell { .. } => {
                unreachable!("Expect/Send statements only ever live inside a Run's script")
            }
            StatementKind::Assertion { .. } => {
                assert::evaluate(statement, &ctx.vars, ctx.last_result.as_ref(), &ctx.cwd)?;
            }
            StatementKind::Action { target } if target == "@" => {
                invoke_snippet(statement, ctx)?;
            }
            StatementKind::Action { .. } => {
                action::execute(statement, &mut ctx.vars, ctx.last_result.as_ref(), &ctx.cwd)?;
            }
        }
    }
    Ok(())
}

fn invoke_snippet(statement: &crate::ast::Statement, ctx: &mut ExecContext<'_>) -> Result<(), StepError> {
    let line = statement.source_line;
    let tail = statement.tail_arguments();
    if tail.is_empty() {
        return Err(StepError::Execution(ExecutionError::MissingSnippet {
            line,
            name: String::new(),
        }));
    }
    // A snippet name can contain spaces, the same as a `>`/`>@` header's
    // name; join every tail token back into one name instead of taking
    // just the first.
    let mut words = Vec::with_capacity(tail.len());
    for arg in tail {
        words.push(ctx.vars.expand(arg, line)?);
    }
    let name = words.join(" ");

    if ctx.active_snippets.iter().any(|n| n == &name) {
        return Err(StepError::Execution(ExecutionError::SnippetCycle { line, name }));
    }

    let snippets: &HashMap<String, Snippet> = ctx.snippets;
    let Some(snippet_statements) = snippets.get(&name).map(|s| s.statements.as_slice()) else {
        return Err(StepError::Execution(ExecutionError::MissingSnippet { line, name }));
    };

    ctx.active_snippets.push(name.clone());
    let result = execute_statements(snippet_statements, ctx);
    ctx.active_snippets.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn run_spec(text: &str) -> RunReport {
        let doc = parser::parse(text, Path::new("t.spec")).expect("parse");
        let runner = Runner::new(doc, RunnerConfig::default());
        runner.run(None)
    }

    #[test]
    fn batch_success_and_substring_assertion() {
        let report = run_spec("> t\n$. echo hello\n?. stdout \"ell\"\n");
        assert!(report.all_passed());
    }

    #[test]
    fn expected_failure_with_empty_stdout() {
        let report = run_spec("> t\n$! sh -c \"exit 3\"\n?! stdout \"anything\"\n");
        assert!(report.all_passed());
    }

    #[test]
    fn variable_capture_and_comparison() {
        let report = run_spec("> t\n$. printf hi\n:. stdout @x\n?. == @x \"hi\"\n");
        assert!(report.all_passed());
    }

    #[test]
    fn file_creation_and_exact_match() {
        let report = run_spec(
            "> t\n:. file \"out.txt\"\n.. alpha\n.. beta\n?. file \"out.txt\"\n.. alpha\n.. beta\n",
        );
        assert!(report.all_passed());
    }

    #[test]
    fn snippet_isolation_across_tests() {
        let report = run_spec(
            ">@ setup\n:. file \"config.txt\"\n.. a\n\
             > first\n:. @ setup\n?. file \"config.txt\"\n\
             > second\n:. @ setup\n?. file \"config.txt\"\n\
             > third\n?! file \"config.txt\"\n",
        );
        assert!(report.all_passed());
        assert_eq!(report.outcomes.len(), 3);
    }

    #[test]
    fn multi_word_snippet_name_is_invoked_by_its_full_name() {
        let report = run_spec(
            ">@ write config\n:. file \"config.txt\"\n.. a\n\
             > t\n:. @ write config\n?. file \"config.txt\"\n",
        );
        assert!(report.all_passed(), "{:?}", report.outcomes);
    }

    #[test]
    fn snippet_cycle_fails_the_test() {
        let report = run_spec(">@ loop\n:. @ loop\n> t\n:. @ loop\n");
        assert!(!report.all_passed());
    }

    #[test]
    fn selector_by_index_runs_one_test() {
        let doc = parser::parse(
            "> first\n$. true\n> second\n$. true\n",
            Path::new("t.spec"),
        )
        .unwrap();
        let runner = Runner::new(doc, RunnerConfig::default());
        let report = runner.run(Some(&TestSelector::Index(2)));
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].name, "second");
    }

    #[test]
    fn selector_by_name_substring() {
        let doc = parser::parse(
            "> alpha case\n$. true\n> beta case\n$. true\n",
            Path::new("t.spec"),
        )
        .unwrap();
        let runner = Runner::new(doc, RunnerConfig::default());
        let report = runner.run(Some(&TestSelector::Name("beta".to_string())));
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].name, "beta case");
    }
}
