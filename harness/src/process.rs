//! Target-program execution with a hard wall-clock deadline.
//!
//! The harness observes a target exclusively through its text output and exit
//! behavior. Output is drained on reader threads concurrently with execution
//! so a chatty target can never deadlock on a full pipe, and a target that
//! outlives its deadline is killed and reaped rather than waited on forever.
//! Orphaned children of a killed target inherit the output pipes; capture
//! stops waiting on them after a short grace period.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// How long to wait for an output stream to close after the target has
/// stopped. A killed target's orphaned children inherit the pipe and can
/// hold it open indefinitely; past this grace the reader is abandoned and
/// whatever arrived so far is returned.
const READER_GRACE: Duration = Duration::from_secs(1);

/// One target-program run request.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    /// Executable and arguments.
    pub command: Vec<String>,
    /// Hard deadline once the startup grace period has elapsed.
    pub timeout: Duration,
    /// Grace period for slow-starting targets, added before timeout
    /// enforcement begins.
    pub startup_delay: Duration,
}

/// Everything the harness observed about a finished run.
#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, when the target exited on its own with one.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CapturedOutput {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run the target and capture stdout/stderr under the deadline.
///
/// Spawn failure (executable not found, permissions) is returned as an error;
/// it is the one condition the caller must not feed into validation.
#[instrument(skip_all, fields(command = %invocation.command.join(" ")))]
pub fn run_and_capture(invocation: &ProcessInvocation) -> Result<CapturedOutput> {
    let (program, args) = invocation
        .command
        .split_first()
        .ok_or_else(|| anyhow!("empty target command"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn target {program}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let (stdout_buf, stdout_done) = capture_stream(stdout);
    let (stderr_buf, stderr_done) = capture_stream(stderr);

    let deadline = invocation.startup_delay + invocation.timeout;
    let mut timed_out = false;
    let status = match child
        .wait_timeout(deadline)
        .context("wait for target process")?
    {
        Some(status) => status,
        None => {
            warn!(deadline_secs = deadline.as_secs_f64(), "target timed out, killing");
            timed_out = true;
            child.kill().context("kill target process")?;
            child.wait().context("reap target process after kill")?
        }
    };

    let stdout = collect_stream("stdout", &stdout_buf, &stdout_done);
    let stderr = collect_stream("stderr", &stderr_buf, &stderr_done);

    debug!(exit_code = ?status.code(), timed_out, "target finished");
    Ok(CapturedOutput {
        stdout,
        stderr,
        exit_code: if timed_out { None } else { status.code() },
        timed_out,
    })
}

/// Drain a stream incrementally into a shared buffer on a reader thread.
///
/// The receiver disconnects when the stream closes; reading into a shared
/// buffer instead of the thread's return value means output captured before
/// a kill survives even when an orphaned child keeps the pipe open.
fn capture_stream<R: Read + Send + 'static>(
    mut reader: R,
) -> (Arc<Mutex<Vec<u8>>>, Receiver<()>) {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = channel::<()>();
    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut bytes) = sink.lock() {
                        bytes.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
        drop(done_tx);
    });
    (buf, done_rx)
}

/// Take whatever the reader gathered, waiting at most [`READER_GRACE`] for
/// the stream to close.
fn collect_stream(name: &str, buf: &Arc<Mutex<Vec<u8>>>, done: &Receiver<()>) -> String {
    if done.recv_timeout(READER_GRACE) == Err(RecvTimeoutError::Timeout) {
        warn!(stream = name, "stream still open after target stopped, abandoning reader");
    }
    let bytes = buf.lock().map(|bytes| bytes.clone()).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
