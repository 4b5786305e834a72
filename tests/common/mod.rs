#![allow(dead_code, unused_imports)]

pub use runtime_validator_test_utils::{
    builders, fake_executor, fakes, init_tracing, logged_context, with_timeout,
};

use std::path::{Path, PathBuf};

/// Write an executable shell script into `dir`.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
