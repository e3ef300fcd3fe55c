//! Subprocess execution with a deadline and cooperative cancellation.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use psp_model::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

#[derive(Debug)]
pub(crate) enum ProcessError {
    Spawn(std::io::Error),
    Io(std::io::Error),
    Canceled,
    TimedOut,
}

pub(crate) fn run(
    program: &str,
    args: &[String],
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ProcessError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ProcessError::Spawn)?;

    let deadline = Instant::now() + timeout;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match wait(&mut child, deadline, cancel) {
        Ok(status) => status,
        Err(error) => {
            // Reap the killed child; its exit status is irrelevant.
            let _ = child.kill();
            let _ = child.wait();
            return Err(error);
        }
    };

    // A background process of the child may still hold the pipes open.
    Ok(ProcessOutput {
        status,
        stdout: collect(stdout, deadline, cancel)?,
        stderr: collect(stderr, deadline, cancel)?,
    })
}

fn wait(
    child: &mut Child,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<ExitStatus, ProcessError> {
    loop {
        match child.try_wait().map_err(ProcessError::Io)? {
            Some(status) => return Ok(status),
            None if cancel.is_canceled() => return Err(ProcessError::Canceled),
            None if Instant::now() >= deadline => return Err(ProcessError::TimedOut),
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

/// Reads a pipe to the end on its own thread so a chatty child never blocks.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        let _ = sender.send(buffer);
    });
    receiver
}

/// Waits for a drained pipe within the same deadline as the child.
///
/// A reader still blocked at the deadline is abandoned.
fn collect(
    pipe: Option<Receiver<Vec<u8>>>,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<String, ProcessError> {
    let Some(receiver) = pipe else {
        return Ok(String::new());
    };
    loop {
        if cancel.is_canceled() {
            return Err(ProcessError::Canceled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProcessError::TimedOut);
        }
        match receiver.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(String::new()),
        }
    }
}
