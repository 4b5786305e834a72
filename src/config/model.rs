// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use tracing::warn;

use crate::config::validate::is_valid_instance_name;
use crate::publish::{DEFAULT_PREFIX, PUBLISH_ATTEMPT_TIMEOUT};
use crate::registry::{CheckDescriptor, Invocation, Registry, RegistryError, SourceRef};
use crate::types::Strategy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// continue_on_failure = true
/// check_timeout = "5m"
///
/// [suite]
/// base = "https://artifacts.example/validation-suite/"
///
/// [[check]]
/// key = "python"
/// name = "Python 3"
/// fetch = "check-python.sh"
///
/// [[check]]
/// key = "postgres"
/// name = "PostgreSQL client"
/// path = "checks/check-postgres.sh"
///
/// [publish.directory]
/// root = "/mnt/results"
/// ```
///
/// This only captures the shape of the file. Use `ConfigFile::try_from` (or
/// [`crate::config::load_and_validate`]) to get a checked configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RawRunSection,

    #[serde(default)]
    pub suite: SuiteSection,

    /// `[[check]]` entries in declaration order.
    #[serde(default)]
    pub check: Vec<RawCheckConfig>,

    #[serde(default)]
    pub bootstrap: BootstrapSection,

    #[serde(default)]
    pub prerequisites: PrerequisitesSection,

    #[serde(default)]
    pub publish: RawPublishSection,

    #[serde(default)]
    pub decommission: DecommissionSection,
}

/// `[run]` section. Every value here can be overridden on the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRunSection {
    /// `"per-runtime"` (default) or `"global"`.
    #[serde(default)]
    pub strategy: Option<String>,

    #[serde(default)]
    pub continue_on_failure: bool,

    /// Per-check timeout as a humantime string (`"90s"`, `"5m"`).
    #[serde(default)]
    pub check_timeout: Option<String>,

    /// Reserved; checks always run one at a time.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SuiteSection {
    /// URL or directory that relative `fetch` references are resolved against.
    #[serde(default)]
    pub base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCheckConfig {
    pub key: String,

    /// Display name; defaults to the key.
    #[serde(default)]
    pub name: Option<String>,

    /// Sort position; defaults to the declaration position.
    #[serde(default)]
    pub order: Option<u32>,

    /// Local executable. Mutually exclusive with `fetch`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Executable to retrieve before the run. Mutually exclusive with `path`.
    #[serde(default)]
    pub fetch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSection {
    /// Tools that must be on `PATH` before anything else happens.
    #[serde(default)]
    pub required_tools: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrerequisitesSection {
    /// Runtime executables that must be installed before the suite is fetched.
    #[serde(default)]
    pub runtimes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPublishSection {
    #[serde(default)]
    pub instance_name: Option<String>,

    #[serde(default)]
    pub prefix: Option<String>,

    /// Upper bound for one transport attempt, e.g. `"90s"`.
    #[serde(default)]
    pub attempt_timeout: Option<String>,

    /// Extra device or file that receives the transient result line.
    #[serde(default)]
    pub console: Option<PathBuf>,

    #[serde(default)]
    pub command: Option<CommandPublishConfig>,

    #[serde(default)]
    pub http: Option<HttpPublishConfig>,

    #[serde(default)]
    pub directory: Option<DirectoryPublishConfig>,
}

/// `[publish.command]`: upload through an external CLI.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandPublishConfig {
    /// Shell template with `{file}` and `{key}` placeholders.
    pub upload: String,

    /// Where the object ends up, with a `{key}` placeholder.
    #[serde(default = "default_command_location")]
    pub location: String,
}

fn default_command_location() -> String {
    "{key}".to_string()
}

/// `[publish.http]`: HTTP PUT to `<url>/<key>`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpPublishConfig {
    pub url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// `[publish.directory]`: write into a (possibly mounted) directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DirectoryPublishConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DecommissionSection {
    /// Shell commands run in order, best-effort.
    #[serde(default)]
    pub commands: Vec<String>,

    #[serde(default)]
    pub remove_work_dir: bool,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub strategy: Strategy,
    pub continue_on_failure: bool,
    pub check_timeout: Option<Duration>,
    pub parallel: bool,
    pub work_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::PerRuntime,
            continue_on_failure: false,
            check_timeout: None,
            parallel: false,
            work_dir: None,
            log_file: None,
        }
    }
}

/// A validated `[[check]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    pub key: String,
    pub name: String,
    pub order: u32,
    pub invocation: Invocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub instance_name: Option<String>,
    pub prefix: String,
    pub attempt_timeout: Duration,
    pub console: Option<PathBuf>,
    pub command: Option<CommandPublishConfig>,
    pub http: Option<HttpPublishConfig>,
    pub directory: Option<DirectoryPublishConfig>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            instance_name: None,
            prefix: DEFAULT_PREFIX.to_string(),
            attempt_timeout: PUBLISH_ATTEMPT_TIMEOUT,
            console: None,
            command: None,
            http: None,
            directory: None,
        }
    }
}

impl PublishSettings {
    /// Configured name, else `$HOSTNAME`, else `unknown-instance`.
    ///
    /// A hostname that is not a valid instance name is ignored.
    pub fn resolve_instance_name(&self) -> String {
        self.instance_name_or(std::env::var("HOSTNAME").ok())
    }

    fn instance_name_or(&self, hostname: Option<String>) -> String {
        if let Some(name) = &self.instance_name {
            return name.clone();
        }
        match hostname {
            Some(host) if is_valid_instance_name(host.trim()) => host.trim().to_string(),
            Some(host) => {
                warn!(hostname = %host, "HOSTNAME is not usable as an instance name");
                UNKNOWN_INSTANCE.to_string()
            }
            None => UNKNOWN_INSTANCE.to_string(),
        }
    }
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(raw)` or [`ConfigFile::builtin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub run: RunSettings,
    pub suite: SuiteSection,
    pub checks: Vec<CheckConfig>,
    pub bootstrap: BootstrapSection,
    pub prerequisites: PrerequisitesSection,
    pub publish: PublishSettings,
    pub decommission: DecommissionSection,
}

pub const UNKNOWN_INSTANCE: &str = "unknown-instance";

/// Checks used when no configuration file is present.
pub const BUILTIN_CHECKS: [(&str, &str); 4] = [
    ("python", "Python"),
    ("java", "Java"),
    ("node", "Node.js"),
    ("postgres", "PostgreSQL client"),
];

impl ConfigFile {
    /// Construct from parts that have already been validated.
    pub(crate) fn new_unchecked(
        run: RunSettings,
        suite: SuiteSection,
        checks: Vec<CheckConfig>,
        bootstrap: BootstrapSection,
        prerequisites: PrerequisitesSection,
        publish: PublishSettings,
        decommission: DecommissionSection,
    ) -> Self {
        Self {
            run,
            suite,
            checks,
            bootstrap,
            prerequisites,
            publish,
            decommission,
        }
    }

    /// The default registry: one `checks/check-<key>.sh` script per runtime.
    pub fn builtin() -> Self {
        let checks = BUILTIN_CHECKS
            .iter()
            .enumerate()
            .map(|(idx, (key, name))| CheckConfig {
                key: key.to_string(),
                name: name.to_string(),
                order: idx as u32,
                invocation: Invocation::Local(PathBuf::from(format!("checks/check-{key}.sh"))),
            })
            .collect();

        Self {
            run: RunSettings::default(),
            suite: SuiteSection::default(),
            checks,
            bootstrap: BootstrapSection::default(),
            prerequisites: PrerequisitesSection::default(),
            publish: PublishSettings::default(),
            decommission: DecommissionSection::default(),
        }
    }

    /// Build the check registry. Relative local paths (and relative fetch
    /// paths) are resolved against `base_dir`, normally the directory that
    /// holds the config file.
    pub fn registry(&self, base_dir: &Path) -> Result<Registry, RegistryError> {
        let descriptors = self
            .checks
            .iter()
            .map(|c| {
                let invocation = match &c.invocation {
                    Invocation::Local(p) if p.is_relative() => Invocation::Local(base_dir.join(p)),
                    Invocation::Fetched(SourceRef::Path(p)) if p.is_relative() => {
                        Invocation::Fetched(SourceRef::Path(base_dir.join(p)))
                    }
                    other => other.clone(),
                };
                CheckDescriptor::new(c.key.clone(), c.name.clone(), c.order, invocation)
            })
            .collect();

        Registry::new(descriptors)
    }

    pub fn check_keys(&self) -> impl Iterator<Item = &str> {
        self.checks.iter().map(|c| c.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_hostname_falls_back_to_unknown_instance() {
        let settings = PublishSettings::default();

        assert_eq!(settings.instance_name_or(Some("vm-7\n".into())), "vm-7");
        assert_eq!(settings.instance_name_or(Some("vm;reboot".into())), UNKNOWN_INSTANCE);
        assert_eq!(settings.instance_name_or(Some("..".into())), UNKNOWN_INSTANCE);
        assert_eq!(settings.instance_name_or(None), UNKNOWN_INSTANCE);

        let named = PublishSettings {
            instance_name: Some("img-42".into()),
            ..PublishSettings::default()
        };
        assert_eq!(named.instance_name_or(Some("other".into())), "img-42");
    }
}
