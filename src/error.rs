//! Error types for the three kinds of failure the runner distinguishes:
//! parse errors (abort before any test runs), execution errors, and test
//! failures (both of which fail only the current test case).

use std::path::PathBuf;

/// Malformed input. Reported with file + line, aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{}:{line}: unrecognized line prefix in {text:?}", file.display())]
    UnknownPrefix {
        file: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{}:{line}: unterminated quoted string", file.display())]
    UnterminatedQuote { file: PathBuf, line: usize },

    #[error("{}:{line}: content block is not attached to any statement", file.display())]
    DanglingContentBlock { file: PathBuf, line: usize },

    #[error(
        "{}:{line}: `$<`/`$>` step must immediately follow a `$.`/`$!` run statement",
        file.display()
    )]
    MisplacedInteractiveStep { file: PathBuf, line: usize },

    #[error("{}:{line}: snippet {name:?} is already defined", file.display())]
    DuplicateSnippet {
        file: PathBuf,
        line: usize,
        name: String,
    },

    #[error("{}:{line}: statement appears outside of any test case or snippet", file.display())]
    NoEnclosingBlock { file: PathBuf, line: usize },

    #[error(
        "{}:{line}: assertion on {target:?} needs an inline argument or a content block",
        file.display()
    )]
    EmptyAssertionTarget {
        file: PathBuf,
        line: usize,
        target: String,
    },

    #[error("{}:{line}: snippet invocation is missing a name", file.display())]
    MissingSnippetName { file: PathBuf, line: usize },

    #[error("{}:{line}: `:.` action needs a target", file.display())]
    MissingFilePath { file: PathBuf, line: usize },
}

/// A failure that happens while running an otherwise well-formed spec:
/// the remainder of the current test is skipped, the run continues.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("line {line}: undefined variable @{name}")]
    UndefinedVariable { line: usize, name: String },

    #[error("line {line}: no snippet named {name:?}")]
    MissingSnippet { line: usize, name: String },

    #[error("line {line}: snippet {name:?} recursively invokes itself")]
    SnippetCycle { line: usize, name: String },

    #[error("line {line}: assertion references process output before any command ran")]
    NoProcessResult { line: usize },

    #[error("line {line}: executable {command:?} not found")]
    ExecutableNotFound { line: usize, command: String },

    #[error("line {line}: {mode:?} is not a valid octal file mode")]
    InvalidFileMode { line: usize, mode: String },

    #[error("line {line}: I/O error on {path:?}: {source}")]
    Io {
        line: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An assertion/action whose target is recognized but whose arguments
    /// don't satisfy that target's minimum shape (e.g. `stdout` with
    /// neither an inline argument nor a content block). Surfaced at
    /// execution time, scoped to the one failing test case. See DESIGN.md.
    #[error("line {line}: {target} needs an inline argument or a content block")]
    MalformedAssertion { line: usize, target: String },
}

/// An assertion or shell-polarity check that evaluated to "fail".
#[derive(Debug, thiserror::Error)]
pub enum TestFailure {
    #[error("line {line}: assertion failed: {detail}")]
    AssertionFailed { line: usize, detail: String },

    #[error(
        "line {line}: expected exit status {expected}, got {actual} (stdout: {stdout:?}, stderr: {stderr:?})"
    )]
    PolarityMismatch {
        line: usize,
        expected: String,
        actual: i32,
        stdout: String,
        stderr: String,
    },

    #[error("line {line}: timed out after {elapsed:?} waiting for {what}")]
    Timeout {
        line: usize,
        elapsed: std::time::Duration,
        what: String,
    },
}

/// Any failure while executing a single statement of an already-parsed spec.
/// Execution errors and test failures are handled identically by the runner
/// (fail the current test, move on to the next), so they share this type.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Failure(#[from] TestFailure),
}
