// src/consumer.rs

//! Consumer-side helpers for reading a verdict back.
//!
//! A polling consumer watches the transient line while the worker lives and
//! reads the durable record afterwards. When both exist, the durable record
//! wins; when neither exists the verdict is `Fail`.

use std::fmt;

use crate::publish::signal::parse_signal_line;
use crate::types::OverallStatus;

/// Last result line in a console capture, if any.
pub fn scan_console(text: &str) -> Option<OverallStatus> {
    text.lines().filter_map(parse_signal_line).last()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Durable,
    Transient,
    /// Nothing was observed; defaulted to `Fail`.
    Neither,
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictSource::Durable => f.write_str("durable record"),
            VerdictSource::Transient => f.write_str("transient signal"),
            VerdictSource::Neither => f.write_str("no result observed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub status: OverallStatus,
    pub source: VerdictSource,
    /// Both channels were seen and they disagree.
    pub conflict: bool,
}

pub fn reconcile(transient: Option<OverallStatus>, durable: Option<OverallStatus>) -> Verdict {
    match (transient, durable) {
        (t, Some(d)) => Verdict {
            status: d,
            source: VerdictSource::Durable,
            conflict: t.is_some_and(|t| t != d),
        },
        (Some(t), None) => Verdict {
            status: t,
            source: VerdictSource::Transient,
            conflict: false,
        },
        (None, None) => Verdict {
            status: OverallStatus::Fail,
            source: VerdictSource::Neither,
            conflict: false,
        },
    }
}
