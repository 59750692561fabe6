//! Configuration for the watch rules and ambient settings.
//!
//! Settings are read from `config.json` in the current working directory and
//! layered over defaults with figment:
//! - Default values (`Settings::default()`)
//! - The JSON document
//!
//! # File Format
//!
//! ```json
//! {
//!   "file": [
//!     { "extensions": [".txt", ".pdf"], "watch": "/data/in", "destination": "/data/docs" }
//!   ],
//!   "debounce_ms": 200,
//!   "logging": { "default": "info", "modules": { "watchsort::operation": "debug" } }
//! }
//! ```
//!
//! Only `file` is required.

use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::operation::OperationKind;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Watch rules, one watch session each
    #[serde(default)]
    pub file: Vec<WatchRule>,

    /// Quiet period after a creation event before the directory is rescanned
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Log filter configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One watched directory and what to do with its matching files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct WatchRule {
    /// Filename suffixes, matched verbatim (e.g. ".pdf")
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Directory to watch (not recursive)
    pub watch: PathBuf,

    /// Where move and copy put files; unused by delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for everything without a module override
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `"watchsort::watcher" = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_debounce_ms() -> u64 {
    200
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file: Vec::new(),
            debounce_ms: default_debounce_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load `config.json` from the current working directory.
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Load {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })?;
        Self::load_from(cwd.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific file.
    ///
    /// The file is read up front: figment treats a missing file as empty,
    /// which would turn a typo into a silent no-op run.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from a JSON document layered over defaults.
    pub fn from_json(content: &str) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Json::string(content))
            .extract()
            .map_err(Box::new)
    }

    /// Check the rules can be run with `operation`.
    pub fn validate(&self, operation: OperationKind) -> Result<(), ConfigError> {
        if self.file.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "no watch rules configured under \"file\"".to_string(),
            });
        }

        for (index, rule) in self.file.iter().enumerate() {
            if rule.watch.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("rule {index}: \"watch\" must not be empty"),
                });
            }

            if rule.extensions.iter().any(|ext| ext.is_empty()) {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "rule {index} ({}): empty extension would match every file",
                        rule.watch.display()
                    ),
                });
            }

            if operation.needs_destination() && rule.destination_dir().is_none() {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "rule {index} ({}): {operation} requires a \"destination\"",
                        rule.watch.display()
                    ),
                });
            }
        }

        Ok(())
    }
}

impl WatchRule {
    /// Destination directory, treating an empty string as absent.
    pub fn destination_dir(&self) -> Option<&Path> {
        self.destination
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}
