// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{
    CheckConfig, ConfigFile, HttpPublishConfig, PublishSettings, RawCheckConfig, RawConfigFile,
    RawPublishSection, RawRunSection, RunSettings,
};
use crate::errors::{Result, ValidatorError};
use crate::publish::{DEFAULT_PREFIX, PUBLISH_ATTEMPT_TIMEOUT};
use crate::registry::{Invocation, SourceRef};
use crate::types::Strategy;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ValidatorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let run = validate_run(&raw.run)?;
        let checks = validate_checks(&raw.check, raw.suite.base.as_deref())?;
        let publish = validate_publish(&raw.publish)?;

        Ok(ConfigFile::new_unchecked(
            run,
            raw.suite,
            checks,
            raw.bootstrap,
            raw.prerequisites,
            publish,
            raw.decommission,
        ))
    }
}

fn config_error(msg: impl Into<String>) -> ValidatorError {
    ValidatorError::ConfigError(msg.into())
}

fn validate_run(raw: &RawRunSection) -> Result<RunSettings> {
    let strategy = match &raw.strategy {
        Some(s) => s
            .parse::<Strategy>()
            .map_err(|e| config_error(format!("[run].strategy: {e}")))?,
        None => Strategy::PerRuntime,
    };

    let check_timeout = match &raw.check_timeout {
        Some(s) => {
            let d = humantime::parse_duration(s.trim()).map_err(|e| {
                config_error(format!("[run].check_timeout: invalid duration {s:?}: {e}"))
            })?;
            if d.is_zero() {
                return Err(config_error("[run].check_timeout must be greater than zero"));
            }
            Some(d)
        }
        None => None,
    };

    Ok(RunSettings {
        strategy,
        continue_on_failure: raw.continue_on_failure,
        check_timeout,
        parallel: raw.parallel,
        work_dir: raw.work_dir.clone(),
        log_file: raw.log_file.clone(),
    })
}

/// Instance names end up in object keys, file paths and upload commands:
/// `[A-Za-z0-9._-]+`, and never `.` or `..`.
pub fn is_valid_instance_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_checks(raw: &[RawCheckConfig], suite_base: Option<&str>) -> Result<Vec<CheckConfig>> {
    if raw.is_empty() {
        return Err(config_error(
            "config must contain at least one [[check]] entry",
        ));
    }

    let mut seen = HashSet::new();
    let mut checks = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.iter().enumerate() {
        let key = entry.key.trim();
        if !is_valid_key(key) {
            return Err(config_error(format!(
                "check #{}: key {:?} must match [A-Za-z0-9_-]+",
                idx + 1,
                entry.key
            )));
        }
        if !seen.insert(key.to_string()) {
            return Err(config_error(format!("duplicate check key '{key}'")));
        }

        let invocation = match (&entry.path, &entry.fetch) {
            (Some(path), None) => Invocation::Local(path.clone()),
            (None, Some(fetch)) => {
                let source = SourceRef::against_base(fetch, suite_base).ok_or_else(|| {
                    config_error(format!(
                        "check '{key}': relative fetch {fetch:?} requires [suite].base"
                    ))
                })?;
                Invocation::Fetched(source)
            }
            (Some(_), Some(_)) => {
                return Err(config_error(format!(
                    "check '{key}': set either `path` or `fetch`, not both"
                )));
            }
            (None, None) => {
                return Err(config_error(format!(
                    "check '{key}': one of `path` or `fetch` is required"
                )));
            }
        };

        checks.push(CheckConfig {
            key: key.to_string(),
            name: entry
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| key.to_string()),
            order: entry.order.unwrap_or(idx as u32),
            invocation,
        });
    }

    Ok(checks)
}

fn validate_publish(raw: &RawPublishSection) -> Result<PublishSettings> {
    if let Some(cmd) = &raw.command {
        if cmd.upload.trim().is_empty() {
            return Err(config_error("[publish.command].upload must not be empty"));
        }
    }

    if let Some(HttpPublishConfig { url, .. }) = &raw.http {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(config_error(format!(
                "[publish.http].url must be an http(s) URL (got {url:?})"
            )));
        }
    }

    if let Some(name) = &raw.instance_name {
        if !is_valid_instance_name(name) {
            return Err(config_error(format!(
                "[publish].instance_name {name:?} must match [A-Za-z0-9._-]+ and not be '.' or '..'"
            )));
        }
    }

    let attempt_timeout = match &raw.attempt_timeout {
        Some(s) => {
            let d = humantime::parse_duration(s.trim()).map_err(|e| {
                config_error(format!("[publish].attempt_timeout: invalid duration {s:?}: {e}"))
            })?;
            if d.is_zero() {
                return Err(config_error("[publish].attempt_timeout must be greater than zero"));
            }
            d
        }
        None => PUBLISH_ATTEMPT_TIMEOUT,
    };

    Ok(PublishSettings {
        instance_name: raw.instance_name.clone(),
        prefix: raw
            .prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        attempt_timeout,
        console: raw.console.clone(),
        command: raw.command.clone(),
        http: raw.http.clone(),
        directory: raw.directory.clone(),
    })
}
