// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ValidatorError};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        ValidatorError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `RuntimeValidator.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("RuntimeValidator.toml")
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ConfigFile,
    /// Directory relative check paths are resolved against.
    pub base_dir: PathBuf,
    pub source: ConfigSource,
}

/// Load `explicit` if given (it must exist), otherwise the default file if
/// present, otherwise the built-in registry.
pub fn load_or_builtin(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = default_config_path();
            if !default.is_file() {
                debug!(path = %default.display(), "no config file, using built-in checks");
                return Ok(LoadedConfig {
                    config: ConfigFile::builtin(),
                    base_dir: PathBuf::from("."),
                    source: ConfigSource::Builtin,
                });
            }
            default
        }
    };

    let config = load_and_validate(&path)?;
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debug!(path = %path.display(), checks = config.checks.len(), "loaded config");

    Ok(LoadedConfig {
        config,
        base_dir,
        source: ConfigSource::File(path),
    })
}
