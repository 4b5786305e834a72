// src/registry/fetch.rs

//! Retrieval of `Fetched` check executables and registry resolution.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use super::{Invocation, Registry, RegistryError, ResolvedCheck, ResolvedRegistry, SourceRef};

/// Trait abstracting how a fetched source lands on disk.
///
/// Production code uses [`TransportFetcher`]; tests can provide an
/// implementation that fails or writes canned scripts.
pub trait SourceFetcher: Send + Sync {
    /// Retrieve `source` and write it to `dest`, replacing any existing file.
    fn fetch<'a>(
        &'a self,
        source: &'a SourceRef,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Fetcher that downloads URLs over HTTP(S) and copies filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct TransportFetcher {
    client: reqwest::Client,
}

impl TransportFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceFetcher for TransportFetcher {
    fn fetch<'a>(
        &'a self,
        source: &'a SourceRef,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let body = match source {
                SourceRef::Url(url) => {
                    let response = self
                        .client
                        .get(url)
                        .send()
                        .await
                        .with_context(|| format!("requesting {url}"))?
                        .error_for_status()
                        .with_context(|| format!("downloading {url}"))?;
                    response
                        .bytes()
                        .await
                        .with_context(|| format!("reading body of {url}"))?
                        .to_vec()
                }
                SourceRef::Path(path) => tokio::fs::read(path)
                    .await
                    .with_context(|| format!("reading {:?}", path))?,
            };

            write_executable(dest, &body)
        })
    }
}

/// Atomically write `body` to `dest` and mark it executable.
fn write_executable(dest: &Path, body: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| anyhow!("destination {:?} has no parent directory", dest))?;
    std::fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("staging file in {:?}", parent))?;
    staged.write_all(body)?;
    staged
        .persist(dest)
        .map_err(|e| anyhow!("persisting {:?}: {}", dest, e.error))?;

    mark_executable(dest).with_context(|| format!("marking {:?} executable", dest))?;
    Ok(())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Where a fetched check is stored inside the suite directory.
pub fn fetched_destination(suite_dir: &Path, key: &str, source: &SourceRef) -> PathBuf {
    let file_name = source.file_name().unwrap_or_else(|| key.to_string());
    suite_dir.join(key).join(file_name)
}

/// Turn every descriptor into a [`ResolvedCheck`].
///
/// - `Local` entries are passed through untouched; a missing local file is
///   reported later as a failed check, not here.
/// - `Fetched` entries are retrieved into `suite_dir`. With `skip_fetch`, a
///   previously fetched copy is reused and its absence is a fault.
///
/// Any retrieval failure aborts resolution with [`RegistryError::FetchFailed`].
pub async fn resolve<F>(
    registry: &Registry,
    fetcher: &F,
    suite_dir: &Path,
    skip_fetch: bool,
) -> Result<ResolvedRegistry, RegistryError>
where
    F: SourceFetcher + ?Sized,
{
    let mut resolved = Vec::with_capacity(registry.len());

    for descriptor in registry.iter() {
        let executable = match &descriptor.invocation {
            Invocation::Local(path) => path.clone(),
            Invocation::Fetched(source) => {
                let dest = fetched_destination(suite_dir, &descriptor.key, source);

                if skip_fetch {
                    if !dest.is_file() {
                        return Err(RegistryError::FetchFailed {
                            key: descriptor.key.clone(),
                            origin: source.to_string(),
                            reason: format!(
                                "setup skipped and no previously fetched copy at {}",
                                dest.display()
                            ),
                        });
                    }
                    debug!(check = %descriptor.key, path = %dest.display(), "reusing fetched check");
                } else {
                    info!(check = %descriptor.key, origin = %source, "fetching check executable");
                    fetcher.fetch(source, &dest).await.map_err(|e| {
                        RegistryError::FetchFailed {
                            key: descriptor.key.clone(),
                            origin: source.to_string(),
                            reason: format!("{e:#}"),
                        }
                    })?;
                }

                dest
            }
        };

        resolved.push(ResolvedCheck {
            descriptor: descriptor.clone(),
            executable,
        });
    }

    Ok(ResolvedRegistry::new(resolved))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::registry::CheckDescriptor;

    /// Records every fetch and writes nothing.
    #[derive(Default)]
    struct CountingFetcher {
        calls: Mutex<usize>,
    }

    impl SourceFetcher for CountingFetcher {
        fn fetch<'a>(
            &'a self,
            _source: &'a SourceRef,
            _dest: &'a Path,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                *self.calls.lock().unwrap() += 1;
                Ok(())
            })
        }
    }

    fn java_registry() -> (Registry, SourceRef) {
        let source = SourceRef::parse("https://suite.example/checks/check-java.sh");
        let registry = Registry::new(vec![CheckDescriptor::new(
            "java",
            "Java",
            0,
            Invocation::Fetched(source.clone()),
        )])
        .unwrap();
        (registry, source)
    }

    #[tokio::test]
    async fn skip_fetch_reuses_the_previous_copy() {
        let suite = tempfile::tempdir().unwrap();
        let (registry, source) = java_registry();
        let dest = fetched_destination(suite.path(), "java", &source);
        write_executable(&dest, b"#!/bin/sh\nexit 0\n").unwrap();

        let fetcher = CountingFetcher::default();
        let resolved = resolve(&registry, &fetcher, suite.path(), true)
            .await
            .unwrap();

        assert_eq!(*fetcher.calls.lock().unwrap(), 0);
        let check = resolved.iter().next().unwrap();
        assert_eq!(check.executable, dest);
        assert_eq!(check.executable, suite.path().join("java/check-java.sh"));
    }

    #[tokio::test]
    async fn skip_fetch_without_a_copy_is_a_fetch_failure() {
        let suite = tempfile::tempdir().unwrap();
        let (registry, _) = java_registry();

        let fetcher = CountingFetcher::default();
        let err = resolve(&registry, &fetcher, suite.path(), true)
            .await
            .unwrap_err();

        assert_eq!(*fetcher.calls.lock().unwrap(), 0);
        match err {
            RegistryError::FetchFailed { key, reason, .. } => {
                assert_eq!(key, "java");
                assert!(reason.contains("no previously fetched copy"), "{reason}");
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn path_sources_are_copied_and_made_executable() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("check-node.sh");
        std::fs::write(&origin, "#!/bin/sh\necho node\n").unwrap();
        let dest = dir.path().join("suite/node/check-node.sh");

        TransportFetcher::new()
            .fetch(&SourceRef::Path(origin), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "#!/bin/sh\necho node\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }
}
