// src/registry/descriptor.rs

//! Check descriptors: the typed registry entries.

use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical check key type (e.g. `"python"`, `"postgres"`).
pub type CheckKey = String;

/// Where a fetched check executable comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// `http://` or `https://` URL, downloaded with a GET request.
    Url(String),
    /// A file on a local or mounted filesystem, copied into the suite dir.
    Path(PathBuf),
}

impl SourceRef {
    /// Interpret a raw `fetch = "..."` reference.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceRef::Url(raw.to_string())
        } else {
            SourceRef::Path(PathBuf::from(raw))
        }
    }

    /// Resolve a relative reference against a `[suite].base` value.
    ///
    /// Absolute URLs and absolute paths are returned unchanged.
    pub fn against_base(raw: &str, base: Option<&str>) -> Option<Self> {
        let parsed = SourceRef::parse(raw);
        match &parsed {
            SourceRef::Url(_) => Some(parsed),
            SourceRef::Path(p) if p.is_absolute() => Some(parsed),
            SourceRef::Path(p) => {
                let base = base?.trim();
                if base.starts_with("http://") || base.starts_with("https://") {
                    Some(SourceRef::Url(format!(
                        "{}/{}",
                        base.trim_end_matches('/'),
                        raw.trim_start_matches("./")
                    )))
                } else {
                    Some(SourceRef::Path(Path::new(base).join(p)))
                }
            }
        }
    }

    /// Last path segment, used as the file name inside the suite dir.
    pub fn file_name(&self) -> Option<String> {
        match self {
            SourceRef::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                without_query
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty() && !s.contains(':'))
                    .map(str::to_string)
            }
            SourceRef::Path(p) => p
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Url(url) => f.write_str(url),
            SourceRef::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// How the executable unit for a check is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Already present on this machine.
    Local(PathBuf),
    /// Retrieved into the suite directory before the run starts.
    Fetched(SourceRef),
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Local(p) => write!(f, "local {}", p.display()),
            Invocation::Fetched(src) => write!(f, "fetch {src}"),
        }
    }
}

/// One registered, independent verification unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDescriptor {
    pub key: CheckKey,
    pub display_name: String,
    pub order: u32,
    pub invocation: Invocation,
}

impl CheckDescriptor {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        order: u32,
        invocation: Invocation,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            order,
            invocation,
        }
    }
}

/// A descriptor together with the concrete executable to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCheck {
    pub descriptor: CheckDescriptor,
    pub executable: PathBuf,
}

impl ResolvedCheck {
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn display_name(&self) -> &str {
        &self.descriptor.display_name
    }
}
