// src/exec/process.rs

//! Process-backed check executor.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::backend::{CheckExecutor, ExecOutcome};
use crate::registry::ResolvedCheck;
use crate::report::write_stdout;

/// How long to keep collecting output after the process is gone. Background
/// children that inherited the pipes must not hold the run hostage.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs each check as a child process with no arguments.
///
/// - stdin is closed, stdout and stderr are merged line by line in arrival
///   order.
/// - With a `timeout`, a check that runs longer is killed and reported
///   without an exit code.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CheckExecutor for ProcessExecutor {
    fn execute<'a>(
        &'a self,
        check: &'a ResolvedCheck,
        echo_output: bool,
    ) -> Pin<Box<dyn Future<Output = ExecOutcome> + Send + 'a>> {
        Box::pin(run_check(check, self.timeout, echo_output))
    }
}

/// Run a single check process to completion (or timeout).
pub async fn run_check(
    check: &ResolvedCheck,
    timeout: Option<Duration>,
    echo_output: bool,
) -> ExecOutcome {
    let path = &check.executable;

    if let Some(problem) = invocation_problem(path) {
        warn!(check = %check.key(), problem = %problem, "check cannot be invoked");
        return ExecOutcome::not_invoked(problem);
    }

    info!(check = %check.key(), path = %path.display(), "starting check process");

    let mut cmd = Command::new(path);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(check = %check.key(), error = %e, "failed to spawn check process");
            return ExecOutcome::not_invoked(format!("failed to start {}: {e}", path.display()));
        }
    };

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut collected = Collected::new(check.key(), echo_output);
    let deadline = timeout.map(|limit| Instant::now() + limit);
    let mut lines_open = true;

    let waited: io::Result<Option<ExitStatus>> = loop {
        tokio::select! {
            line = line_rx.recv(), if lines_open => match line {
                Some(line) => collected.push(line),
                None => lines_open = false,
            },
            status = child.wait() => break status.map(Some),
            _ = sleep_until_opt(deadline) => break Ok(None),
        }
    };

    match waited {
        Ok(Some(status)) => {
            collected.drain(&mut line_rx).await;
            info!(
                check = %check.key(),
                exit_code = ?status.code(),
                success = status.success(),
                "check process exited"
            );
            match status.code() {
                Some(code) => ExecOutcome::exited(code, collected.output),
                None => ExecOutcome {
                    exit_code: None,
                    output: collected.output,
                    detail: Some(format!("terminated without exit code ({status})")),
                },
            }
        }
        Ok(None) => {
            let limit = timeout.unwrap_or_default();
            warn!(
                check = %check.key(),
                timeout = %humantime::format_duration(limit),
                "check timed out; killing process"
            );
            if let Err(e) = child.kill().await {
                warn!(check = %check.key(), error = %e, "failed to kill timed out check");
            }
            collected.drain(&mut line_rx).await;
            ExecOutcome {
                exit_code: None,
                output: collected.output,
                detail: Some(format!(
                    "timed out after {}",
                    humantime::format_duration(limit)
                )),
            }
        }
        Err(e) => {
            collected.drain(&mut line_rx).await;
            ExecOutcome {
                exit_code: None,
                output: collected.output,
                detail: Some(format!("failed waiting for process: {e}")),
            }
        }
    }
}

/// Why `path` cannot be invoked, if it obviously can't.
fn invocation_problem(path: &Path) -> Option<String> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Some(format!("executable not found: {}", path.display()));
        }
        Err(e) => return Some(format!("cannot inspect {}: {e}", path.display())),
    };

    if meta.is_dir() {
        return Some(format!("not an executable file (is a directory): {}", path.display()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Some(format!("not executable (no execute permission): {}", path.display()));
        }
    }

    None
}

fn spawn_line_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output pipe read failed");
                    break;
                }
            }
        }
    });
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Output accumulator for one check.
struct Collected<'a> {
    key: &'a str,
    echo: bool,
    output: String,
}

impl<'a> Collected<'a> {
    fn new(key: &'a str, echo: bool) -> Self {
        Self {
            key,
            echo,
            output: String::new(),
        }
    }

    fn push(&mut self, line: String) {
        debug!(check = %self.key, "output: {}", line);
        if self.echo {
            write_stdout(&format!("    {line}\n"));
        }
        self.output.push_str(&line);
        self.output.push('\n');
    }

    /// Pick up lines still buffered after exit, bounded by the drain grace.
    async fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<String>) {
        let deadline = Instant::now() + OUTPUT_DRAIN_GRACE;
        while let Ok(Some(line)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            self.push(line);
        }
    }
}
