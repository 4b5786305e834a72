use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use runtime_validator::publish::{Artifact, PublishOutcome, Publisher};
use runtime_validator::registry::{SourceFetcher, SourceRef};

/// In-memory object store. Re-publishing a key overwrites it.
#[derive(Debug, Clone)]
pub struct RecordingPublisher {
    name: String,
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl RecordingPublisher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn calls(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    /// Keys in the order they were published.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.history.lock().unwrap().push(artifact.key.clone());
            self.objects
                .lock()
                .unwrap()
                .insert(artifact.key.clone(), artifact.body.clone());
            PublishOutcome::Stored {
                location: format!("mem://{}/{}", self.name, artifact.key),
            }
        })
    }
}

/// Publisher that never stores anything.
#[derive(Debug, Clone)]
pub struct FailingPublisher {
    name: String,
    outcome: PublishOutcome,
    calls: Arc<Mutex<usize>>,
}

impl FailingPublisher {
    pub fn unavailable(name: &str) -> Self {
        Self::with_outcome(name, PublishOutcome::Unavailable(format!("{name} not installed")))
    }

    pub fn failed(name: &str) -> Self {
        Self::with_outcome(name, PublishOutcome::Failed(format!("{name} write refused")))
    }

    fn with_outcome(name: &str, outcome: PublishOutcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Publisher for FailingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish<'a>(
        &'a self,
        _artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(async move {
            *self.calls.lock().unwrap() += 1;
            self.outcome.clone()
        })
    }
}

/// Publisher whose attempts never complete.
#[derive(Debug, Clone)]
pub struct HangingPublisher {
    name: String,
}

impl HangingPublisher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Publisher for HangingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish<'a>(
        &'a self,
        _artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(std::future::pending())
    }
}

/// Fetcher that writes a stub script, or fails for every source when
/// constructed with [`FakeFetcher::unreachable`].
#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    unreachable: bool,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch<'a>(
        &'a self,
        source: &'a SourceRef,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.fetched.lock().unwrap().push(source.to_string());
            if self.unreachable {
                anyhow::bail!("connection refused");
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, "#!/bin/sh\nexit 0\n")?;
            Ok(())
        })
    }
}
