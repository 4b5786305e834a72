// src/fs/mod.rs

//! Filesystem abstraction used by the directory-backed durable store and by
//! cleanup. [`mock::MockFileSystem`] keeps everything in memory for tests.

use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace the file at `path` with `contents`, creating parent dirs.
    /// Readers observe either the old or the new contents, never a mix.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;

    /// Remove a file or a directory tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;

        let mut staged = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("staging file in {:?}", parent))?;
        staged
            .write_all(contents)
            .with_context(|| format!("writing staged file for {:?}", path))?;
        staged
            .persist(path)
            .map_err(|e| anyhow!("replacing {:?}: {}", path, e.error))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let res = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {:?}", path)),
        }
    }
}
