//! Interprets `?.`/`?!` assertion statements against the most recent
//! [`ProcessResult`], the filesystem, or the variable store.

use std::fs;
use std::path::Path;

use crate::ast::Polarity;
use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::error::ExecutionError;
use crate::error::StepError;
use crate::error::TestFailure;
use crate::process::ProcessResult;
use crate::vars::VariableStore;

/// Strips trailing newlines for exact (content-block) comparisons.
/// Substring checks use the stream as captured, unnormalized.
fn strip_trailing_newlines(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}

fn exact_matches(actual: &str, block: &[String]) -> bool {
    strip_trailing_newlines(actual) == block.join("\n")
}

pub fn evaluate(
    statement: &Statement,
    vars: &VariableStore,
    last_result: Option<&ProcessResult>,
    cwd: &Path,
) -> Result<(), StepError> {
    let StatementKind::Assertion { target } = &statement.kind else {
        panic!("assert::evaluate called on a non-Assertion statement");
    };
    let tail = statement.tail_arguments();
    let line = statement.source_line;

    let predicate = match target.as_str() {
        "stdout" | "stderr" => {
            let result = last_result.ok_or(ExecutionError::NoProcessResult { line })?;
            let stream = if target == "stdout" {
                &result.stdout
            } else {
                &result.stderr
            };
            stream_predicate(stream, tail, statement.content_block.as_deref(), vars, target, line)?
        }
        "file" => {
            let Some(path_arg) = tail.first() else {
                return Err(StepError::Execution(ExecutionError::MalformedAssertion {
                    line,
                    target: "file".to_string(),
                }));
            };
            let path = vars.expand(path_arg, line)?;
            let full_path = cwd.join(&path);
            file_predicate(&full_path, &tail[1..], statement.content_block.as_deref(), vars, line)?
        }
        "==" | "!=" => {
            let (a, b) = binary_operands(tail, vars, target, line)?;
            let equal = a == b;
            if target == "==" { equal } else { !equal }
        }
        "startswith" => {
            let (a, b) = binary_operands(tail, vars, target, line)?;
            a.starts_with(&b)
        }
        "endswith" => {
            let (a, b) = binary_operands(tail, vars, target, line)?;
            a.ends_with(&b)
        }
        "contains" => {
            let (a, b) = binary_operands(tail, vars, target, line)?;
            a.contains(&b)
        }
        other => {
            return Err(StepError::Execution(ExecutionError::MalformedAssertion {
                line,
                target: other.to_string(),
            }));
        }
    };

    let expected = statement.polarity.apply(predicate);
    if expected {
        return Ok(());
    }
    Err(StepError::Failure(TestFailure::AssertionFailed {
        line,
        detail: describe(statement, last_result),
    }))
}

fn stream_predicate(
    stream: &str,
    tail: &[crate::ast::Argument],
    content_block: Option<&[String]>,
    vars: &VariableStore,
    target: &str,
    line: usize,
) -> Result<bool, StepError> {
    match (tail.first(), content_block) {
        (Some(text_arg), _) => {
            let text = vars.expand(text_arg, line)?;
            Ok(stream.contains(&text))
        }
        (None, Some(block)) => Ok(exact_matches(stream, block)),
        (None, None) => Err(StepError::Execution(ExecutionError::MalformedAssertion {
            line,
            target: target.to_string(),
        })),
    }
}

fn file_predicate(
    path: &Path,
    rest: &[crate::ast::Argument],
    content_block: Option<&[String]>,
    vars: &VariableStore,
    line: usize,
) -> Result<bool, StepError> {
    match (rest.first(), content_block) {
        (Some(text_arg), _) => {
            let text = vars.expand(text_arg, line)?;
            let contents = read_file(path, line)?;
            Ok(contents.contains(&text))
        }
        (None, Some(block)) => {
            let contents = read_file(path, line)?;
            Ok(exact_matches(&contents, block))
        }
        (None, None) => Ok(path.exists()),
    }
}

fn read_file(path: &Path, line: usize) -> Result<String, StepError> {
    fs::read_to_string(path)
        .map_err(|source| {
            StepError::Execution(ExecutionError::Io {
                line,
                path: path.to_path_buf(),
                source,
            })
        })
}

fn binary_operands(
    tail: &[crate::ast::Argument],
    vars: &VariableStore,
    target: &str,
    line: usize,
) -> Result<(String, String), StepError> {
    if tail.len() != 2 {
        return Err(StepError::Execution(ExecutionError::MalformedAssertion {
            line,
            target: target.to_string(),
        }));
    }
    let a = vars.expand(&tail[0], line)?;
    let b = vars.expand(&tail[1], line)?;
    Ok((a, b))
}

fn describe(statement: &Statement, last_result: Option<&ProcessResult>) -> String {
    let StatementKind::Assertion { target } = &statement.kind else {
        unreachable!()
    };
    let negated = matches!(statement.polarity, Polarity::Negative);
    match last_result {
        Some(result) => format!(
            "{}{} (exit {}, stdout {:?}, stderr {:?})",
            if negated { "!" } else { "" },
            target,
            result.exit_status,
            result.stdout,
            result.stderr
        ),
        None => format!("{}{}", if negated { "!" } else { "" }, target),
    }
}
