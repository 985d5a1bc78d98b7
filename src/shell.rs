//! Executes one Shell/Run [`Statement`]: resolves the alias table and
//! variable references, dispatches to the batch or interactive driver
//! depending on whether an interaction script was attached at parse time,
//! and applies the polarity check against the exit status.

use std::path::Path;

use crate::ast::Polarity;
use crate::ast::ShellVerb;
use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::config::AliasTable;
use crate::error::StepError;
use crate::error::TestFailure;
use crate::process;
use crate::process::ProcessResult;
use crate::process::Step;
use crate::vars::VariableStore;
use crate::RunnerConfig;

/// Runs a Shell/Run statement and checks the resulting exit status against
/// its polarity, producing a [`TestFailure::PolarityMismatch`] on mismatch.
pub fn execute(
    statement: &Statement,
    vars: &VariableStore,
    aliases: &AliasTable,
    cwd: &Path,
    config: &RunnerConfig,
) -> Result<ProcessResult, StepError> {
    let StatementKind::Shell { verb: ShellVerb::Run, script } = &statement.kind else {
        panic!("shell::execute called on a non-Run statement");
    };

    let mut expanded = Vec::with_capacity(statement.arguments.len());
    for arg in &statement.arguments {
        expanded.push(vars.expand(arg, statement.source_line)?);
    }
    let Some((command, args)) = expanded.split_first() else {
        return Err(StepError::Execution(crate::error::ExecutionError::Io {
            line: statement.source_line,
            path: cwd.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        }));
    };
    let program = aliases.resolve(command).to_string();

    let result = if script.is_empty() {
        process::run_batch(&program, args, cwd, config.shell_timeout, statement.source_line)?
    } else {
        let mut steps = Vec::with_capacity(script.len());
        for step_stmt in script {
            let StatementKind::Shell { verb, .. } = &step_stmt.kind else {
                unreachable!("interaction script only holds Expect/Send statements");
            };
            let text = step_stmt
                .arguments
                .first()
                .map(|a| vars.expand(a, step_stmt.source_line))
                .transpose()?
                .unwrap_or_default();
            steps.push(match verb {
                ShellVerb::Expect => Step::Expect(text),
                ShellVerb::Send => Step::Send(text),
                ShellVerb::Run => unreachable!("Run statement nested in its own script"),
            });
        }
        process::run_interactive(
            &program,
            args,
            cwd,
            &steps,
            config.expect_timeout,
            statement.source_line,
        )?
    };

    check_polarity(statement, &result)?;
    Ok(result)
}

fn check_polarity(statement: &Statement, result: &ProcessResult) -> Result<(), StepError> {
    let expected_success = statement.polarity == Polarity::Positive;
    if result.succeeded() == expected_success {
        return Ok(());
    }
    Err(StepError::Failure(TestFailure::PolarityMismatch {
        line: statement.source_line,
        expected: if expected_success {
            "0".to_string()
        } else {
            "non-zero".to_string()
        },
        actual: result.exit_status,
        stdout: result.stdout.clone(),
        stderr: result.stderr.clone(),
    }))
}
