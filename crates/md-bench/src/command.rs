//! Engine command execution with streaming output
//!
//! Runs one engine invocation, merging stdout and stderr into a single line
//! channel that is echoed as it arrives and captured in arrival order. The
//! caller blocks until the process exits, times out or is cancelled.

use crate::error::RunnerError;
use crate::logging::LineSink;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, ErrorKind, PipeReader};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn attempts while the executable is still open for writing elsewhere
const SPAWN_ATTEMPTS: u32 = 5;

/// First delay between spawn attempts, doubled after each one
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Configuration for command execution
#[derive(Debug, Clone, Default)]
pub struct CommandConfig {
    /// Kill the process if it runs longer than this; `None` waits forever
    pub timeout: Option<Duration>,
}

impl CommandConfig {
    /// Create with a timeout in seconds; `0` disables the timeout
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}

/// The concrete command line and environment for one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInvocation {
    /// Resolved executable path
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Replaces the inherited environment when set
    pub env: Option<BTreeMap<String, String>>,
    /// Directory the engine runs in (and leaves its transient files in)
    pub working_dir: Option<PathBuf>,
}

impl RunInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: None,
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: Option<BTreeMap<String, String>>) -> Self {
        self.env = env;
        self
    }

    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Space-joined command line, as recorded in the result document
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything one execution produced
#[derive(Debug, Clone)]
pub struct RawRunOutput {
    /// All output lines, newline-terminated, in arrival order
    pub text: String,
    /// Exit code; `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

impl RawRunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

enum Outcome {
    Finished(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Run an invocation, echoing each output line to `sink` while capturing it.
///
/// # Returns
/// * `Ok(output)` once the process exits, whatever its exit code
/// * `Err(Spawn)` if the executable cannot be started
/// * `Err(TimedOut | Cancelled)` after killing the process
pub async fn run_command_streaming(
    invocation: &RunInvocation,
    sink: &dyn LineSink,
    config: &CommandConfig,
    cancel: &CancellationToken,
) -> Result<RawRunOutput, RunnerError> {
    let command_line = invocation.command_line();
    info!(
        command = %command_line,
        timeout_secs = config.timeout.map(|t| t.as_secs_f64()),
        "Running command"
    );

    let (mut child, reader) = spawn(invocation, &command_line).await?;
    let start = Instant::now();

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_line_reader(reader, tx);

    let mut captured = String::new();
    let outcome = tokio::select! {
        status = drain_and_wait(&mut child, &mut rx, sink, &mut captured) => Outcome::Finished(status),
        timeout = deadline(config.timeout) => Outcome::TimedOut(timeout),
        _ = cancel.cancelled() => Outcome::Cancelled,
    };

    match outcome {
        Outcome::Finished(Ok(status)) => {
            let elapsed = start.elapsed();
            debug!(
                command = %command_line,
                exit_code = status.code(),
                elapsed_secs = elapsed.as_secs_f64(),
                "Command finished"
            );
            Ok(RawRunOutput {
                text: captured,
                exit_code: status.code(),
                elapsed,
            })
        }
        Outcome::Finished(Err(source)) => Err(RunnerError::Io {
            command: command_line,
            source,
        }),
        Outcome::TimedOut(timeout) => {
            warn!(
                command = %command_line,
                timeout_secs = timeout.as_secs_f64(),
                "Command timed out, killing process group"
            );
            kill(&mut child).await;
            Err(RunnerError::TimedOut {
                command: command_line,
                timeout,
            })
        }
        Outcome::Cancelled => {
            warn!(command = %command_line, "Command cancelled, killing process group");
            kill(&mut child).await;
            Err(RunnerError::Cancelled {
                command: command_line,
            })
        }
    }
}

async fn drain_and_wait(
    child: &mut Child,
    rx: &mut mpsc::UnboundedReceiver<std::io::Result<String>>,
    sink: &dyn LineSink,
    captured: &mut String,
) -> std::io::Result<ExitStatus> {
    // Channel closes once every holder of the pipe's write end has exited
    while let Some(line) = rx.recv().await {
        let line = line?;
        sink.write_line(&line);
        captured.push_str(&line);
        captured.push('\n');
    }
    child.wait().await
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Start the engine with stdout and stderr sharing one pipe.
///
/// Retries while the executable is busy (`ETXTBSY`): a freshly written script
/// stays open for writing in any process forked before its writer closed it.
async fn spawn(
    invocation: &RunInvocation,
    command_line: &str,
) -> Result<(Child, PipeReader), RunnerError> {
    let spawn_err = |source: std::io::Error| RunnerError::Spawn {
        command: command_line.to_string(),
        source,
    };

    let mut delay = SPAWN_RETRY_DELAY;
    let mut attempt = 1;
    loop {
        let (reader, writer) = std::io::pipe().map_err(spawn_err)?;
        let stderr_writer = writer.try_clone().map_err(spawn_err)?;

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer))
            .kill_on_drop(true);
        // Own process group so a timeout reaches whatever the engine forked
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(env) = &invocation.env {
            cmd.env_clear().envs(env);
        }
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let spawned = cmd.spawn();
        // Our copies of the write end must go, or the reader never sees EOF
        drop(cmd);

        match spawned {
            Ok(child) => return Ok((child, reader)),
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempt < SPAWN_ATTEMPTS => {
                debug!(command = %command_line, attempt, "Executable busy, retrying spawn");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(spawn_err(e)),
        }
    }
}

/// Kill the engine's whole process group, then reap the engine itself
async fn kill(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        // SAFETY: killpg has no memory-safety preconditions
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
            warn!(pgid, error = %std::io::Error::last_os_error(), "Failed to kill process group");
        }
    }
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill process");
    }
}

/// Forward each line of the merged output to `tx` from a dedicated thread
fn spawn_line_reader(reader: PipeReader, tx: mpsc::UnboundedSender<std::io::Result<String>>) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(&['\n', '\r'][..])
                        .to_string();
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
}
