// src/registry/mod.rs

//! Check descriptor registry.
//!
//! - [`descriptor`] defines the typed entries (`CheckDescriptor`,
//!   `Invocation`, `SourceRef`).
//! - [`fetch`] retrieves `Fetched` executables into the suite directory and
//!   produces a [`ResolvedRegistry`] the orchestrator can run.
//!
//! The registry is established before a run begins and never mutated while
//! the run is in progress.

pub mod descriptor;
pub mod fetch;

use std::path::Path;

use thiserror::Error;

pub use descriptor::{CheckDescriptor, CheckKey, Invocation, ResolvedCheck, SourceRef};
pub use fetch::{SourceFetcher, TransportFetcher};

/// Faults raised while establishing the registry. These surface as setup
/// faults, never as check failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry contains no checks")]
    Empty,

    #[error("duplicate check key '{0}'")]
    DuplicateKey(CheckKey),

    #[error("failed to fetch check '{key}' from {origin}: {reason}")]
    FetchFailed {
        key: CheckKey,
        origin: String,
        reason: String,
    },
}

/// Ordered, immutable list of check descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    checks: Vec<CheckDescriptor>,
}

impl Registry {
    /// Build a registry, ordering entries by `order` (ties keep declaration
    /// order) and rejecting duplicate keys.
    pub fn new(mut checks: Vec<CheckDescriptor>) -> Result<Self, RegistryError> {
        if checks.is_empty() {
            return Err(RegistryError::Empty);
        }

        checks.sort_by_key(|c| c.order);

        for (idx, check) in checks.iter().enumerate() {
            if checks[..idx].iter().any(|other| other.key == check.key) {
                return Err(RegistryError::DuplicateKey(check.key.clone()));
            }
        }

        Ok(Self { checks })
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckDescriptor> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CheckDescriptor> {
        self.checks.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.checks.iter().map(|c| c.key.as_str())
    }

    /// Pin every entry to a concrete executable, fetching where needed.
    /// See [`fetch::resolve`].
    pub async fn resolve<F>(
        &self,
        fetcher: &F,
        suite_dir: &Path,
        skip_fetch: bool,
    ) -> Result<ResolvedRegistry, RegistryError>
    where
        F: SourceFetcher + ?Sized,
    {
        fetch::resolve(self, fetcher, suite_dir, skip_fetch).await
    }
}

/// Registry whose entries all point at a concrete executable.
#[derive(Debug, Clone)]
pub struct ResolvedRegistry {
    checks: Vec<ResolvedCheck>,
}

impl ResolvedRegistry {
    pub fn new(checks: Vec<ResolvedCheck>) -> Self {
        Self { checks }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedCheck> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn local(key: &str, order: u32) -> CheckDescriptor {
        CheckDescriptor::new(
            key,
            key.to_uppercase(),
            order,
            Invocation::Local(PathBuf::from(format!("checks/{key}.sh"))),
        )
    }

    #[test]
    fn orders_by_order_then_declaration() {
        let registry = Registry::new(vec![
            local("node", 20),
            local("python", 10),
            local("java", 10),
        ])
        .unwrap();

        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["python", "java", "node"]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = Registry::new(vec![local("python", 1), local("python", 2)]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKey("python".into()));
    }

    #[test]
    fn rejects_empty_registry() {
        assert_eq!(Registry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }
}
