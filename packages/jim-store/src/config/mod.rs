//! Store configuration
//!
//! Resolution order, lowest to highest precedence:
//! 1. Built-in defaults (`~/.jim/app.db`)
//! 2. YAML file (`version: 1` required)
//! 3. `JIM_DB` environment variable
//! 4. Explicit overrides from the caller (e.g. a `--db` flag)
//!
//! ```yaml
//! version: 1
//! database:
//!   path: /home/me/.jim/app.db
//!   busy_timeout_ms: 5000
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;
pub const DB_ENV_VAR: &str = "JIM_DB";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JimConfig {
    pub database: DatabaseConfig,
}

/// SQLite connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file; parent directories are created on open
    pub path: PathBuf,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: home.join(".jim").join("app.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    version: Option<u32>,

    #[serde(default)]
    database: DatabaseConfig,
}

impl JimConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(yaml)?;
        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(CONFIG_VERSION) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: vec![CONFIG_VERSION],
                })
            }
        }

        let config = Self {
            database: file.database,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(CONFIG_VERSION),
            database: self.database.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    /// Apply `JIM_DB` when set and non-empty
    pub fn with_env_overrides(self) -> Self {
        let db = std::env::var_os(DB_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.with_database_path(db)
    }

    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database.path = path;
        }
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Range {
                field: "database.path".to_string(),
                value: "\"\"".to_string(),
                hint: "Set a database file path.".to_string(),
            });
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::Range {
                field: "database.busy_timeout_ms".to_string(),
                value: "0".to_string(),
                hint: "Use a positive number of milliseconds.".to_string(),
            });
        }
        Ok(())
    }
}
