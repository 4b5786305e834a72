// src/errors.rs

//! Crate-wide error type and its mapping onto process exit codes.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::types::RunExit;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("Setup fault: {0}")]
    SetupFault(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ValidatorError {
    /// Classify the error into the exit code taxonomy.
    ///
    /// Configuration and usage problems never start a run; everything else
    /// that escapes to the top level happened while preparing the environment.
    pub fn run_exit(&self) -> RunExit {
        match self {
            ValidatorError::ConfigError(_)
            | ValidatorError::UsageError(_)
            | ValidatorError::TomlError(_) => RunExit::Usage,
            ValidatorError::SetupFault(_)
            | ValidatorError::Registry(_)
            | ValidatorError::Other(_) => RunExit::Setup,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.run_exit().code()
    }
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
