//! Batch-mode execution: spawn, capture stdout/stderr separately, wait
//! under a wall-clock timeout.

use std::path::Path;
use std::time::Duration;
use std::time::Instant;

use subprocess::Popen;
use subprocess::PopenConfig;
use subprocess::Redirection;
use tracing::debug;
use tracing::warn;

use crate::error::ExecutionError;
use crate::error::StepError;
use crate::error::TestFailure;

use super::result::Mode;
use super::result::ProcessResult;

/// Runs `program` with `args` in `cwd`, capturing stdout/stderr separately
/// and failing with [`TestFailure::Timeout`] if it outlives `timeout`.
pub fn run_batch(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    line: usize,
) -> Result<ProcessResult, StepError> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program.to_string());
    argv.extend(args.iter().cloned());

    debug!(line, program, args = ?args, "spawning batch command");

    let mut child = Popen::create(
        &argv,
        PopenConfig {
            stdout: Redirection::Pipe,
            stderr: Redirection::Pipe,
            stdin: Redirection::Pipe,
            cwd: Some(cwd.as_os_str().to_owned()),
            ..Default::default()
        },
    )
    .map_err(|_| ExecutionError::ExecutableNotFound {
        line,
        command: program.to_string(),
    })?;

    let started = Instant::now();
    let outcome = child.communicate_start(None).limit_time(timeout).read_string();

    let (stdout, stderr, timed_out) = match outcome {
        Ok((out, err)) => (out.unwrap_or_default(), err.unwrap_or_default(), false),
        Err(err) => {
            let (out, err_bytes) = err.capture;
            (
                out.map(|b| String::from_utf8_lossy(&b).into_owned())
                    .unwrap_or_default(),
                err_bytes
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .unwrap_or_default(),
                true,
            )
        }
    };

    if timed_out {
        warn!(line, program, "batch command timed out, terminating");
        let _ = child.terminate();
        if child
            .wait_timeout(Duration::from_millis(500))
            .ok()
            .flatten()
            .is_none()
        {
            let _ = child.kill();
        }
        let _ = child.wait();
        return Err(StepError::Failure(TestFailure::Timeout {
            line,
            elapsed: started.elapsed(),
            what: format!("command `{program}` to exit"),
        }));
    }

    let status = child.wait().map_err(|source| ExecutionError::Io {
        line,
        path: cwd.to_path_buf(),
        source: std::io::Error::other(source),
    })?;

    Ok(ProcessResult {
        exit_status: exit_code(&status),
        stdout,
        stderr,
        mode: Mode::Batch,
        transcript: None,
    })
}

fn exit_code(status: &subprocess::ExitStatus) -> i32 {
    match status {
        subprocess::ExitStatus::Exited(code) => *code as i32,
        subprocess::ExitStatus::Signaled(sig) => -(*sig as i32),
        subprocess::ExitStatus::Other(code) => *code,
        subprocess::ExitStatus::Undetermined => -1,
    }
}
