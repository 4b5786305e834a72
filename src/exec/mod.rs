// src/exec/mod.rs

//! Check execution layer.
//!
//! - [`backend`] provides the `CheckExecutor` trait the orchestrator talks
//!   to, and the `ExecOutcome` it gets back.
//! - [`process`] is the production executor: one child process per check,
//!   merged output capture, optional timeout.

pub mod backend;
pub mod process;

pub use backend::{CheckExecutor, ExecOutcome};
pub use process::ProcessExecutor;

/// `sh -c <line>` (or `cmd /C` on Windows), stdin closed.
pub fn shell_command(command_line: &str) -> tokio::process::Command {
    let mut cmd = if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };
    cmd.stdin(std::process::Stdio::null()).kill_on_drop(true);
    cmd
}
