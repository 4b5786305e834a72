// src/publish/chain.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::store::{Artifact, PublishOutcome, Publisher};

/// One publisher's try at storing an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub publisher: String,
    pub outcome: PublishOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Delivered {
        publisher: String,
        location: String,
        attempts: Vec<Attempt>,
    },
    /// Every publisher was tried and none stored the artifact.
    Exhausted { attempts: Vec<Attempt> },
}

impl ChainOutcome {
    pub fn location(&self) -> Option<&str> {
        match self {
            ChainOutcome::Delivered { location, .. } => Some(location),
            ChainOutcome::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            ChainOutcome::Delivered { attempts, .. } | ChainOutcome::Exhausted { attempts } => {
                attempts
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, ChainOutcome::Delivered { .. })
    }
}

/// Default upper bound for one publisher attempt.
pub const PUBLISH_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Ordered list of publishers; the first one that stores the artifact wins.
///
/// Each attempt is cut off after `attempt_timeout` and counts as failed, so
/// a hung transport cannot hold up the rest of the chain.
#[derive(Debug, Clone)]
pub struct PublisherChain {
    publishers: Vec<Arc<dyn Publisher>>,
    attempt_timeout: Duration,
}

impl Default for PublisherChain {
    fn default() -> Self {
        Self {
            publishers: Vec::new(),
            attempt_timeout: PUBLISH_ATTEMPT_TIMEOUT,
        }
    }
}

impl PublisherChain {
    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = limit;
        self
    }

    pub fn with(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn push(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.push(publisher);
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    pub async fn publish(&self, artifact: &Artifact) -> ChainOutcome {
        let mut attempts = Vec::with_capacity(self.publishers.len());

        for publisher in &self.publishers {
            let name = publisher.name().to_string();
            debug!(publisher = %name, key = %artifact.key, "publishing artifact");
            let outcome =
                match tokio::time::timeout(self.attempt_timeout, publisher.publish(artifact)).await {
                    Ok(outcome) => outcome,
                    Err(_) => PublishOutcome::Failed(format!(
                        "timed out after {}",
                        humantime::format_duration(self.attempt_timeout)
                    )),
                };

            match &outcome {
                PublishOutcome::Stored { location } => {
                    info!(publisher = %name, key = %artifact.key, %location, "artifact stored");
                    let location = location.clone();
                    attempts.push(Attempt {
                        publisher: name.clone(),
                        outcome,
                    });
                    return ChainOutcome::Delivered {
                        publisher: name,
                        location,
                        attempts,
                    };
                }
                PublishOutcome::Unavailable(reason) => {
                    debug!(publisher = %name, %reason, "publisher unavailable, trying next");
                }
                PublishOutcome::Failed(reason) => {
                    warn!(publisher = %name, key = %artifact.key, %reason, "publish attempt failed");
                }
            }
            attempts.push(Attempt {
                publisher: name,
                outcome,
            });
        }

        ChainOutcome::Exhausted { attempts }
    }
}
