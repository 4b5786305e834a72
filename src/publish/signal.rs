// src/publish/signal.rs

//! Channel A: the one-line transient signal.
//!
//! Emitted exactly once per run, never retried. A consumer that is not
//! watching at that instant has to fall back to the durable record.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::types::OverallStatus;

pub const SIGNAL_KEY: &str = "RUNTIME_VALIDATION_RESULT";

// Console captures often prefix lines with timestamps or unit names.
static SIGNAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)RUNTIME_VALIDATION_RESULT=(Pass|Fail)\s*$")
        .expect("signal line pattern is valid")
});

/// `RUNTIME_VALIDATION_RESULT=Pass` or `RUNTIME_VALIDATION_RESULT=Fail`.
pub fn signal_line(status: OverallStatus) -> String {
    format!("{SIGNAL_KEY}={status}")
}

pub fn write_signal<W: Write>(mut out: W, status: OverallStatus) -> io::Result<()> {
    writeln!(out, "{}", signal_line(status))?;
    out.flush()
}

/// Recognise a signal line, tolerating a leading log prefix.
pub fn parse_signal_line(line: &str) -> Option<OverallStatus> {
    let caps = SIGNAL_LINE.captures(line.trim_end_matches(['\r', '\n']))?;
    caps.get(1)?.as_str().parse().ok()
}

/// Writes the signal to stdout and, optionally, to a console device such as
/// a serial port that the consumer can read while the worker is alive.
#[derive(Debug, Clone, Default)]
pub struct SignalEmitter {
    console: Option<PathBuf>,
}

impl SignalEmitter {
    pub fn new(console: Option<PathBuf>) -> Self {
        Self { console }
    }

    /// Returns whether the stdout emission succeeded.
    pub fn emit(&self, status: OverallStatus) -> bool {
        let stdout_ok = match write_signal(io::stdout().lock(), status) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to write result signal to stdout");
                false
            }
        };

        if let Some(console) = &self.console {
            let res = OpenOptions::new()
                .create(true)
                .append(true)
                .open(console)
                .and_then(|f| write_signal(f, status));
            if let Err(e) = res {
                warn!(console = %console.display(), error = %e, "failed to write result signal to console");
            }
        }

        info!(%status, "result signal emitted");
        stdout_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_has_exact_wire_form() {
        let mut buf = Vec::new();
        write_signal(&mut buf, OverallStatus::Pass).unwrap();
        assert_eq!(buf, b"RUNTIME_VALIDATION_RESULT=Pass\n");
    }

    #[test]
    fn parses_prefixed_console_lines() {
        assert_eq!(
            parse_signal_line("[  42.1] cloud-init[812]: RUNTIME_VALIDATION_RESULT=Fail\r\n"),
            Some(OverallStatus::Fail)
        );
        assert_eq!(
            parse_signal_line("RUNTIME_VALIDATION_RESULT=Pass"),
            Some(OverallStatus::Pass)
        );
    }

    #[test]
    fn rejects_lookalikes() {
        assert_eq!(parse_signal_line("RUNTIME_VALIDATION_RESULT=Passed"), None);
        assert_eq!(parse_signal_line("XRUNTIME_VALIDATION_RESULT=Pass"), None);
        assert_eq!(parse_signal_line("echo RUNTIME_VALIDATION_RESULT=Pass; done"), None);
    }

    #[test]
    fn console_receives_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let console = dir.path().join("ttyS0");

        let emitter = SignalEmitter::new(Some(console.clone()));
        assert!(emitter.emit(OverallStatus::Fail));

        let text = std::fs::read_to_string(console).unwrap();
        assert_eq!(text, "RUNTIME_VALIDATION_RESULT=Fail\n");
    }
}
