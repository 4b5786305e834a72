// src/publish/store.rs

//! Durable-channel transports.
//!
//! Each transport implements [`Publisher`] and reports the expected failure
//! paths through [`PublishOutcome`] instead of returning errors, so a
//! [`PublisherChain`](super::chain::PublisherChain) can simply move on to the
//! next one.

use std::fmt;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::exec::shell_command;
use crate::fs::FileSystem;

/// One object to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Object key, `/`-separated (e.g. `runtime-validation/vm-1/validation.log`).
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Written; `location` is what a consumer would use to read it back.
    Stored { location: String },
    /// The mechanism is not usable on this machine (tool missing, endpoint
    /// unreachable). Try the next one.
    Unavailable(String),
    /// The mechanism was usable but the write failed.
    Failed(String),
}

/// A single way of writing artifacts to durable storage.
pub trait Publisher: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn publish<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>>;
}

/// Stores artifacts as files under a root directory (e.g. a mounted bucket).
/// Re-publishing a key replaces the file.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|seg| !seg.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Read a previously stored object back.
    pub fn read_back(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.fs.read(&self.path_for(key))
    }
}

impl Publisher for DirectoryPublisher {
    fn name(&self) -> &str {
        "directory"
    }

    fn publish<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(async move {
            let path = self.path_for(&artifact.key);
            match self.fs.write(&path, &artifact.body) {
                Ok(()) => PublishOutcome::Stored {
                    location: path.display().to_string(),
                },
                Err(e) => PublishOutcome::Failed(format!("{e:#}")),
            }
        })
    }
}

/// Uploads through an external CLI (e.g. a cloud storage client).
///
/// `upload` is a shell template; `{file}` is replaced with a staged copy of
/// the body and `{key}` with the object key. `location` uses the same `{key}`
/// placeholder to describe where the object ends up.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    upload: String,
    location: String,
}

impl CommandPublisher {
    pub fn new(upload: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            upload: upload.into(),
            location: location.into(),
        }
    }

    fn program(&self) -> Option<&str> {
        self.upload.split_whitespace().next()
    }

    fn availability(&self) -> Result<(), String> {
        let program = self
            .program()
            .ok_or_else(|| "upload command template is empty".to_string())?;

        if program.contains('/') {
            if Path::new(program).is_file() {
                Ok(())
            } else {
                Err(format!("upload tool {program} does not exist"))
            }
        } else {
            which::which(program)
                .map(|_| ())
                .map_err(|_| format!("upload tool '{program}' not found on PATH"))
        }
    }
}

impl Publisher for CommandPublisher {
    fn name(&self) -> &str {
        "command"
    }

    fn publish<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(async move {
            if let Err(reason) = self.availability() {
                return PublishOutcome::Unavailable(reason);
            }

            let staged = match stage_body(&artifact.body) {
                Ok(staged) => staged,
                Err(e) => return PublishOutcome::Failed(format!("staging upload: {e}")),
            };

            let command_line = self
                .upload
                .replace("{file}", &shell_quote(&staged.path().display().to_string()))
                .replace("{key}", &shell_quote(&artifact.key));
            debug!(command = %command_line, "running upload command");

            let res = shell_command(&command_line).output().await;
            // Keep the staged file alive until the upload has finished.
            drop(staged);

            match res {
                Ok(output) if output.status.success() => PublishOutcome::Stored {
                    location: self.location.replace("{key}", &artifact.key),
                },
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    PublishOutcome::Failed(format!(
                        "upload command exited with {}: {}",
                        output.status,
                        tail(&stderr, 400)
                    ))
                }
                Err(e) => PublishOutcome::Failed(format!("running upload command: {e}")),
            }
        })
    }
}

/// Uploads with an HTTP PUT to `<url>/<key>`. A query string on `url`
/// (e.g. a SAS token) is kept after the key. Requests give up after
/// `timeout`, connection included.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpPublisher {
    pub fn new(url: impl Into<String>, headers: Vec<(String, String)>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "http client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
            headers,
        }
    }

    /// Full request URL and the query-less location for `key`.
    pub fn object_url(&self, key: &str) -> (String, String) {
        let (base, query) = match self.url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.url.as_str(), None),
        };
        let location = format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'));
        let target = match query {
            Some(q) if !q.is_empty() => format!("{location}?{q}"),
            _ => location.clone(),
        };
        (target, location)
    }
}

impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        "http"
    }

    fn publish<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send + 'a>> {
        Box::pin(async move {
            let (target, location) = self.object_url(&artifact.key);

            let mut request = self
                .client
                .put(&target)
                .header(reqwest::header::CONTENT_TYPE, artifact.content_type)
                .body(artifact.body.clone());
            for (name, value) in &self.headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    PublishOutcome::Stored { location }
                }
                Ok(response) => {
                    PublishOutcome::Failed(format!("PUT {location} returned {}", response.status()))
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    PublishOutcome::Unavailable(format!("endpoint unreachable: {e}"))
                }
                Err(e) => PublishOutcome::Failed(format!("PUT {location} failed: {e}")),
            }
        })
    }
}

fn stage_body(body: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(body)?;
    staged.flush()?;
    Ok(staged)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn tail(s: &str, max: usize) -> &str {
    let s = s.trim();
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
