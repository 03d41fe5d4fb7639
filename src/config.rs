//! Engine configuration
//!
//! The configuration file carries the update strategy, registry credentials,
//! ignore rules and group definitions. It is read from YAML, TOML or JSON
//! depending on the file extension. Values that cannot be used fall back to a
//! safe default and are reported as `ConfigWarning`s rather than errors.

use crate::domain::UpdateStrategy;
use crate::error::ConfigError;
use crate::grouping::GroupConfig;
use crate::registry::RegistryCredential;
use crate::update::IgnoreRule;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = ".chartup.yaml";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Update strategy ("patch", "minor", "major" or "all")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Credentials for chart repositories and OCI registries
    pub registries: Vec<RegistryCredential>,
    /// Ignore rules
    pub ignore: Vec<IgnoreRule>,
    /// Group definitions in priority order
    pub groups: IndexMap<String, GroupConfig>,
}

impl Config {
    /// Load a configuration file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let config = match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                // An empty YAML document deserializes as null
                if content.trim().is_empty() {
                    Config::default()
                } else {
                    serde_yaml::from_str(&content)
                        .map_err(|e| ConfigError::parse_error(path, e.to_string()))?
                }
            }
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load the given file, or the default file if it exists, or defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Override the configured strategy (builder pattern)
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Resolve the update strategy, falling back to `all` for unknown values
    pub fn update_strategy(&self) -> (UpdateStrategy, Option<ConfigWarning>) {
        let Some(raw) = self.strategy.as_deref() else {
            return (UpdateStrategy::default(), None);
        };
        match raw.parse::<UpdateStrategy>() {
            Ok(strategy) => (strategy, None),
            Err(e) => (
                UpdateStrategy::All,
                Some(ConfigWarning::new(
                    WarningKind::UnknownStrategy,
                    "strategy",
                    raw,
                    format!("{}; using 'all'", e),
                )),
            ),
        }
    }
}

/// Category of a configuration warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnknownStrategy,
    InvalidUpdateType,
    InvalidVersionPattern,
    InvalidGroupPattern,
    MissingCredentialEnv,
    UnknownAuthType,
}

/// A configuration value that was coerced or dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub kind: WarningKind,
    /// Location of the value in the config (e.g. "ignore[0].versions")
    pub field: String,
    /// The offending value
    pub value: String,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(
        kind: WarningKind,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Log the warning with structured fields
    pub fn emit(&self) {
        warn!(field = %self.field, value = %self.value, "{}", self.message);
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            ".yaml",
            r#"
strategy: minor
registries:
  - registry: ghcr.io
    auth-type: bearer
    password: token
ignore:
  - name: nginx
    versions: ["16.x"]
groups:
  bitnami:
    patterns: ["bitnami-*"]
  databases:
    patterns: ["postgres*", "redis"]
    update-types: [patch]
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.strategy.as_deref(), Some("minor"));
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.ignore[0].name, "nginx");
        let names: Vec<_> = config.groups.keys().cloned().collect();
        assert_eq!(names, vec!["bitnami", "databases"]);
        assert_eq!(config.groups["databases"].update_types, vec!["patch"]);
    }

    #[test]
    fn test_load_toml() {
        let file = write_config(
            ".toml",
            r#"
strategy = "patch"

[[ignore]]
name = "redis"

[groups.infra]
patterns = ["cert-manager", "ingress-*"]
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.strategy.as_deref(), Some("patch"));
        assert_eq!(config.ignore[0].name, "redis");
        assert!(config.ignore[0].versions.is_empty());
        assert_eq!(config.groups["infra"].patterns.len(), 2);
    }

    #[test]
    fn test_load_json() {
        let file = write_config(".json", r#"{"strategy": "major"}"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.update_strategy().0, UpdateStrategy::Major);
    }

    #[test]
    fn test_load_empty_yaml() {
        let file = write_config(".yml", "");
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_load_unsupported_extension() {
        let file = write_config(".ini", "strategy=all");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_load_parse_error() {
        let file = write_config(".yaml", "strategy: [unterminated");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/chartup.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_discover_explicit_path() {
        let file = write_config(".yaml", "strategy: patch\n");
        let config = Config::discover(Some(file.path())).unwrap();
        assert_eq!(config.strategy.as_deref(), Some("patch"));
    }

    #[test]
    fn test_update_strategy_default() {
        let (strategy, warning) = Config::default().update_strategy();
        assert_eq!(strategy, UpdateStrategy::All);
        assert!(warning.is_none());
    }

    #[test]
    fn test_update_strategy_override() {
        let config = Config::default().with_strategy("patch");
        assert_eq!(config.update_strategy().0, UpdateStrategy::Patch);
    }

    #[test]
    fn test_unknown_strategy_falls_back_to_all() {
        let (strategy, warning) = Config::default().with_strategy("newest").update_strategy();
        assert_eq!(strategy, UpdateStrategy::All);
        let warning = warning.unwrap();
        assert_eq!(warning.kind, WarningKind::UnknownStrategy);
        assert_eq!(warning.field, "strategy");
        assert_eq!(warning.value, "newest");
        assert!(warning.message.contains("using 'all'"));
    }

    #[test]
    fn test_warning_display() {
        let warning = ConfigWarning::new(
            WarningKind::InvalidGroupPattern,
            "groups.web.patterns",
            "[",
            "invalid glob",
        );
        assert_eq!(warning.to_string(), "groups.web.patterns: invalid glob");
    }
}
