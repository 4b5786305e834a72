// src/diagnostics.rs

//! The single append-only diagnostic log of a run.
//!
//! Every line is timestamped and written in call order by the one owner of
//! the [`RunContext`](crate::context::RunContext), so no locking is involved.
//! The file is uploaded through the durable channel at publish time.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

#[derive(Debug)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
    file: Option<File>,
    write_failed: bool,
}

impl DiagnosticLog {
    /// Create (or truncate) the log file at `path`, creating parent dirs.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            file: Some(file),
            write_failed: false,
        })
    }

    /// A log that discards everything (dry runs, tests that don't care).
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
            write_failed: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one timestamped line.
    pub fn line(&mut self, message: impl AsRef<str>) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.write_raw(&format!("[{stamp}] {}\n", message.as_ref()));
    }

    /// Append a visually separated section header.
    pub fn section(&mut self, title: impl AsRef<str>) {
        self.write_raw("\n");
        self.line(format!("===== {} =====", title.as_ref()));
    }

    /// Append captured process output verbatim, indented.
    pub fn output_block(&mut self, output: &str) {
        if output.is_empty() {
            self.write_raw("    (no output)\n");
            return;
        }
        let mut block = String::with_capacity(output.len() + 64);
        for line in output.lines() {
            block.push_str("    ");
            block.push_str(line);
            block.push('\n');
        }
        self.write_raw(&block);
    }

    fn write_raw(&mut self, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let res = file.write_all(text.as_bytes()).and_then(|_| file.flush());
        if let Err(e) = res {
            // Report once; the run itself must not fail because of the log.
            if !self.write_failed {
                warn!(path = ?self.path, error = %e, "failed to write diagnostic log");
                self.write_failed = true;
            }
        }
    }
}
