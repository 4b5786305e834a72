// src/publish/mod.rs

//! Dual-channel result delivery.
//!
//! Channel B (durable) is written first: the diagnostic log, then the
//! [`ResultEnvelope`] that references it. Channel A (the transient signal
//! line) is emitted last, so a consumer that sees the line can already read
//! the durable record. Nothing in here returns an error; every failure ends
//! up as a warning in the [`PublishReport`].

pub mod chain;
pub mod envelope;
pub mod signal;
pub mod store;

use std::path::Path;

use tracing::{info, warn};

pub use chain::{Attempt, ChainOutcome, PUBLISH_ATTEMPT_TIMEOUT, PublisherChain};
pub use envelope::{EnvelopeCheck, ResultEnvelope, SCHEMA_VERSION};
pub use signal::{SignalEmitter, parse_signal_line, signal_line};
pub use store::{
    Artifact, CommandPublisher, DirectoryPublisher, HttpPublisher, PublishOutcome, Publisher,
};

use crate::model::RunOutcome;

pub const RESULT_FILE: &str = "validation-result.json";
pub const LOG_FILE: &str = "validation.log";
pub const DEFAULT_PREFIX: &str = "runtime-validation";

/// `<prefix>/<instance>/<file>`, with an empty prefix omitted.
pub fn object_key(prefix: &str, instance: &str, file: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{instance}/{file}")
    } else {
        format!("{prefix}/{instance}/{file}")
    }
}

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub envelope: ResultEnvelope,
    pub envelope_delivery: ChainOutcome,
    /// `None` when the run had no log file to upload.
    pub log_delivery: Option<ChainOutcome>,
    pub signal_emitted: bool,
}

impl PublishReport {
    pub fn durable_location(&self) -> Option<&str> {
        self.envelope_delivery.location()
    }

    /// Human-readable problems, for the lifecycle's warning list.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(ChainOutcome::Exhausted { attempts }) = &self.log_delivery {
            out.push(format!(
                "diagnostic log not stored durably ({})",
                describe_attempts(attempts)
            ));
        }
        if let ChainOutcome::Exhausted { attempts } = &self.envelope_delivery {
            out.push(format!(
                "result envelope not stored durably ({})",
                describe_attempts(attempts)
            ));
        }
        if !self.signal_emitted {
            out.push("result signal could not be written to stdout".to_string());
        }
        out
    }
}

fn describe_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no durable transport configured".to_string();
    }
    attempts
        .iter()
        .map(|a| match &a.outcome {
            PublishOutcome::Stored { .. } => format!("{}: stored", a.publisher),
            PublishOutcome::Unavailable(r) => format!("{}: unavailable: {r}", a.publisher),
            PublishOutcome::Failed(r) => format!("{}: {r}", a.publisher),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Writes a run's verdict through both channels.
#[derive(Debug, Clone)]
pub struct ResultPublisher {
    signal: SignalEmitter,
    chain: PublisherChain,
    prefix: String,
}

impl ResultPublisher {
    pub fn new(signal: SignalEmitter, chain: PublisherChain, prefix: impl Into<String>) -> Self {
        Self {
            signal,
            chain,
            prefix: prefix.into(),
        }
    }

    pub async fn publish(
        &self,
        instance_name: &str,
        outcome: &RunOutcome,
        log_path: Option<&Path>,
    ) -> PublishReport {
        if self.chain.is_empty() {
            warn!("no durable transport configured; only the transient signal will be emitted");
        }

        let log_delivery = match log_path {
            Some(path) => Some(self.publish_log(instance_name, path).await),
            None => None,
        };

        // Fall back to the local path so the envelope still says where the
        // log lived, even if it never left the worker.
        let log_reference = log_delivery
            .as_ref()
            .and_then(ChainOutcome::location)
            .map(str::to_string)
            .or_else(|| log_path.map(|p| p.display().to_string()))
            .unwrap_or_else(|| "none".to_string());

        let envelope = match outcome {
            RunOutcome::Completed(run) => ResultEnvelope::for_run(instance_name, run, log_reference),
            RunOutcome::SetupFault { reason } => {
                ResultEnvelope::for_setup_fault(instance_name, reason.as_str(), log_reference)
            }
        };

        let envelope_delivery = match envelope.to_json() {
            Ok(body) => {
                let artifact = Artifact {
                    key: object_key(&self.prefix, instance_name, RESULT_FILE),
                    body,
                    content_type: "application/json",
                };
                self.chain.publish(&artifact).await
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize result envelope");
                ChainOutcome::Exhausted {
                    attempts: Vec::new(),
                }
            }
        };

        match envelope_delivery.location() {
            Some(location) => info!(%location, scan_result = %envelope.scan_result, "durable record written"),
            None => warn!("durable record could not be written by any transport"),
        }

        let signal_emitted = self.signal.emit(envelope.scan_result);

        PublishReport {
            envelope,
            envelope_delivery,
            log_delivery,
            signal_emitted,
        }
    }

    async fn publish_log(&self, instance_name: &str, path: &Path) -> ChainOutcome {
        let body = match tokio::fs::read(path).await {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read diagnostic log for upload");
                return ChainOutcome::Exhausted {
                    attempts: vec![Attempt {
                        publisher: "local".to_string(),
                        outcome: PublishOutcome::Failed(format!("reading log: {e}")),
                    }],
                };
            }
        };

        let artifact = Artifact {
            key: object_key(&self.prefix, instance_name, LOG_FILE),
            body,
            content_type: "text/plain; charset=utf-8",
        };
        self.chain.publish(&artifact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_follow_prefix_instance_file() {
        assert_eq!(
            object_key("runtime-validation", "vm-1", RESULT_FILE),
            "runtime-validation/vm-1/validation-result.json"
        );
        assert_eq!(object_key("/nested/p/", "vm-1", LOG_FILE), "nested/p/vm-1/validation.log");
        assert_eq!(object_key("", "vm-1", LOG_FILE), "vm-1/validation.log");
    }

    #[test]
    fn empty_chain_is_reported_as_unconfigured() {
        let report = PublishReport {
            envelope: ResultEnvelope::for_setup_fault("vm", "boom", "none"),
            envelope_delivery: ChainOutcome::Exhausted {
                attempts: Vec::new(),
            },
            log_delivery: None,
            signal_emitted: true,
        };
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no durable transport configured"));
    }
}
