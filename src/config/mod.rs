// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed raw model and the validated `ConfigFile`.
//! - `loader.rs`: reading a file from disk, or falling back to built-ins.
//! - `validate.rs`: `RawConfigFile` -> `ConfigFile` conversion.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    ConfigSource, LoadedConfig, default_config_path, load_and_validate, load_from_path,
    load_or_builtin,
};
pub use model::{
    CheckConfig, CommandPublishConfig, ConfigFile, DirectoryPublishConfig, HttpPublishConfig,
    PublishSettings, RawConfigFile, RunSettings,
};
