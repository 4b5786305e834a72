#![allow(dead_code)]

use std::path::PathBuf;

use runtime_validator::config::model::{
    DirectoryPublishConfig, RawCheckConfig, RawConfigFile,
};
use runtime_validator::config::ConfigFile;
use runtime_validator::registry::{
    CheckDescriptor, Invocation, Registry, ResolvedCheck, ResolvedRegistry, SourceRef,
};

/// The four runtimes used throughout the scenarios, in registration order.
pub const RUNTIMES: [&str; 4] = ["python", "java", "node", "postgres"];

/// Registry of local checks `/checks/check-<key>.sh`, ordered as given.
pub fn local_registry(keys: &[&str]) -> Registry {
    let descriptors = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            CheckDescriptor::new(
                *key,
                key.to_uppercase(),
                idx as u32,
                Invocation::Local(PathBuf::from(format!("/checks/check-{key}.sh"))),
            )
        })
        .collect();
    Registry::new(descriptors).expect("valid test registry")
}

/// Registry of fetched checks served from `base`.
pub fn fetched_registry(keys: &[&str], base: &str) -> Registry {
    let descriptors = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            CheckDescriptor::new(
                *key,
                key.to_uppercase(),
                idx as u32,
                Invocation::Fetched(SourceRef::parse(&format!(
                    "{}/check-{key}.sh",
                    base.trim_end_matches('/')
                ))),
            )
        })
        .collect();
    Registry::new(descriptors).expect("valid test registry")
}

/// Resolved registry without touching the filesystem.
pub fn resolved(keys: &[&str]) -> ResolvedRegistry {
    let registry = local_registry(keys);
    ResolvedRegistry::new(
        registry
            .iter()
            .map(|d| ResolvedCheck {
                executable: match &d.invocation {
                    Invocation::Local(p) => p.clone(),
                    Invocation::Fetched(_) => PathBuf::from("/fetched"),
                },
                descriptor: d.clone(),
            })
            .collect(),
    )
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_local_check(mut self, key: &str, path: &str) -> Self {
        self.config.check.push(RawCheckConfig {
            key: key.to_string(),
            name: None,
            order: None,
            path: Some(PathBuf::from(path)),
            fetch: None,
        });
        self
    }

    pub fn with_fetched_check(mut self, key: &str, fetch: &str) -> Self {
        self.config.check.push(RawCheckConfig {
            key: key.to_string(),
            name: None,
            order: None,
            path: None,
            fetch: Some(fetch.to_string()),
        });
        self
    }

    pub fn suite_base(mut self, base: &str) -> Self {
        self.config.suite.base = Some(base.to_string());
        self
    }

    pub fn continue_on_failure(mut self, val: bool) -> Self {
        self.config.run.continue_on_failure = val;
        self
    }

    pub fn publish_to_directory(mut self, root: &str) -> Self {
        self.config.publish.directory = Some(DirectoryPublishConfig {
            root: PathBuf::from(root),
        });
        self
    }

    pub fn instance_name(mut self, name: &str) -> Self {
        self.config.publish.instance_name = Some(name.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
