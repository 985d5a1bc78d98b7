//! Interactive-mode execution: spawn the child under a pseudo-terminal so
//! it sees a tty (and so does not switch to block-buffered output), then
//! drive an ordered `$<`/`$>` script against the combined transcript.
//!
//! A background thread owns the pty master's read half and forwards bytes
//! over a channel; the step loop below only ever blocks in
//! `recv_timeout`, which is what gives each `$<` its own bounded wait.

use std::io::Read;
use std::io::Write;
use std::os::fd::FromRawFd;
use std::os::fd::IntoRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use nix::pty::openpty;
use nix::unistd::dup;
use nix::unistd::setsid;
use tracing::trace;

use crate::error::ExecutionError;
use crate::error::StepError;
use crate::error::TestFailure;

use super::result::Mode;
use super::result::ProcessResult;

nix::ioctl_write_int_bad!(set_controlling_tty, nix::libc::TIOCSCTTY);

/// One resolved `$<`/`$>` step, after alias and variable expansion.
pub enum Step {
    Expect(String),
    Send(String),
}

fn io_error(line: usize, path: &Path, source: nix::Error) -> ExecutionError {
    ExecutionError::Io {
        line,
        path: path.to_path_buf(),
        source: std::io::Error::from(source),
    }
}

/// Runs `program` with `args` under a pty in `cwd`, driving `steps` in
/// order and then waiting for exit, all bounded by `step_timeout` per
/// blocking operation.
pub fn run_interactive(
    program: &str,
    args: &[String],
    cwd: &Path,
    steps: &[Step],
    step_timeout: Duration,
    line: usize,
) -> Result<ProcessResult, StepError> {
    let pty = openpty(None, None).map_err(|source| io_error(line, cwd, source))?;
    let (master, slave) = (pty.master, pty.slave);

    let stdin_fd = dup(&slave).map_err(|source| io_error(line, cwd, source))?.into_raw_fd();
    let stdout_fd = dup(&slave).map_err(|source| io_error(line, cwd, source))?.into_raw_fd();
    let stderr_fd = dup(&slave).map_err(|source| io_error(line, cwd, source))?.into_raw_fd();

    let mut command = Command::new(program);
    command.args(args).current_dir(cwd);
    // Safety: the closure only calls async-signal-safe syscalls (setsid,
    // ioctl) between fork and exec, as required by `pre_exec`.
    unsafe {
        command
            .stdin(Stdio::from_raw_fd(stdin_fd))
            .stdout(Stdio::from_raw_fd(stdout_fd))
            .stderr(Stdio::from_raw_fd(stderr_fd))
            .pre_exec(|| {
                setsid().map_err(std::io::Error::from)?;
                set_controlling_tty(0, 0).map_err(std::io::Error::from)?;
                Ok(())
            });
    }

    let mut child = command.spawn().map_err(|_| ExecutionError::ExecutableNotFound {
        line,
        command: program.to_string(),
    })?;
    // The child owns its copies of the slave fd now; drop ours so reads on
    // the master see EOF once the child actually exits.
    drop(slave);

    let reader_fd = dup(&master).map_err(|source| io_error(line, cwd, source))?.into_raw_fd();
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let reader_handle = thread::spawn(move || {
        let mut file = unsafe { std::fs::File::from_raw_fd(reader_fd) };
        let mut buf = [0u8; 4096];
        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let started = Instant::now();
    let mut transcript = String::new();

    for step in steps {
        match step {
            Step::Expect(text) => {
                let deadline = Instant::now() + step_timeout;
                loop {
                    if transcript.contains(text.as_str()) {
                        break;
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(StepError::Failure(TestFailure::Timeout {
                            line,
                            elapsed: started.elapsed(),
                            what: format!("output to contain {text:?}"),
                        }));
                    }
                    match rx.recv_timeout(remaining) {
                        Ok(bytes) => {
                            trace!(line, bytes = bytes.len(), "interactive output chunk");
                            transcript.push_str(&String::from_utf8_lossy(&bytes));
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }
            Step::Send(text) => {
                let send_fd = dup(&master).map_err(|source| io_error(line, cwd, source))?.into_raw_fd();
                let mut writer = unsafe { std::fs::File::from_raw_fd(send_fd) };
                writeln!(writer, "{text}").map_err(|source| ExecutionError::Io {
                    line,
                    path: cwd.to_path_buf(),
                    source,
                })?;
            }
        }
    }

    let wait_deadline = Instant::now() + step_timeout;
    let status = loop {
        if let Some(status) = child.try_wait().map_err(|source| ExecutionError::Io {
            line,
            path: cwd.to_path_buf(),
            source,
        })? {
            break status;
        }
        if Instant::now() >= wait_deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StepError::Failure(TestFailure::Timeout {
                line,
                elapsed: started.elapsed(),
                what: "child process to exit".to_string(),
            }));
        }
        thread::sleep(Duration::from_millis(15));
    };

    drop(master);
    let _ = reader_handle.join();
    while let Ok(bytes) = rx.try_recv() {
        transcript.push_str(&String::from_utf8_lossy(&bytes));
    }

    let exit_status = status.code().unwrap_or(-1);

    Ok(ProcessResult {
        exit_status,
        stdout: transcript.clone(),
        stderr: String::new(),
        mode: Mode::Interactive,
        transcript: Some(transcript),
    })
}
