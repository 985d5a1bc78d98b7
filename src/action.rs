//! Interprets `:.` action statements other than snippet invocation
//! (`:. @ name`, which needs recursive access to the statement dispatcher
//! and lives in [`crate::runner`] instead).

use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::error::ExecutionError;
use crate::error::StepError;
use crate::process::ProcessResult;
use crate::vars::VariableStore;

pub fn execute(
    statement: &Statement,
    vars: &mut VariableStore,
    last_result: Option<&ProcessResult>,
    cwd: &Path,
) -> Result<(), StepError> {
    let StatementKind::Action { target } = &statement.kind else {
        panic!("action::execute called on a non-Action statement");
    };
    let tail = statement.tail_arguments();
    let line = statement.source_line;

    match target.as_str() {
        "stdout" | "stderr" => {
            let Some(var_arg) = tail.first() else {
                return Err(StepError::Execution(ExecutionError::MalformedAssertion {
                    line,
                    target: target.clone(),
                }));
            };
            let crate::ast::Argument::VarRef(name) = var_arg else {
                return Err(StepError::Execution(ExecutionError::MalformedAssertion {
                    line,
                    target: target.clone(),
                }));
            };
            let result = last_result.ok_or(ExecutionError::NoProcessResult { line })?;
            let value = if target == "stdout" {
                &result.stdout
            } else {
                &result.stderr
            };
            vars.set(name, value.clone());
            Ok(())
        }
        "file" => write_file(statement, tail, vars, cwd, line),
        other => Err(StepError::Execution(ExecutionError::MalformedAssertion {
            line,
            target: other.to_string(),
        })),
    }
}

fn write_file(
    statement: &Statement,
    tail: &[crate::ast::Argument],
    vars: &VariableStore,
    cwd: &Path,
    line: usize,
) -> Result<(), StepError> {
    let Some(path_arg) = tail.first() else {
        return Err(StepError::Execution(ExecutionError::MalformedAssertion {
            line,
            target: "file".to_string(),
        }));
    };
    let path = vars.expand(path_arg, line)?;
    let full_path = cwd.join(&path);

    let block = statement.content_block.clone().unwrap_or_default();
    let mut body = block.join("\n");
    if !block.is_empty() {
        body.push('\n');
    }

    fs::write(&full_path, body).map_err(|source| ExecutionError::Io {
        line,
        path: full_path.clone(),
        source,
    })?;

    if let Some(mode_arg) = tail.get(1) {
        let mode_str = vars.expand(mode_arg, line)?;
        let mode = u32::from_str_radix(&mode_str, 8).map_err(|_| ExecutionError::InvalidFileMode {
            line,
            mode: mode_str.clone(),
        })?;
        set_permissions(&full_path, mode, line)?;
    }

    Ok(())
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32, line: usize) -> Result<(), StepError> {
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions).map_err(|source| {
        StepError::Execution(ExecutionError::Io {
            line,
            path: path.to_path_buf(),
            source,
        })
    })
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32, _line: usize) -> Result<(), StepError> {
    Ok(())
}
