//! Configuration types and parsing for schemabuild.yml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::planner::ExpansionPolicy;

/// File names searched for in a project directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["schemabuild.yml", "schemabuild.yaml"];

/// Main project configuration from schemabuild.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directory holding the SQL scripts, relative to the repository root
    #[serde(default = "default_scripts_path")]
    pub scripts_path: String,

    /// File extensions treated as scripts (without the leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Schema assumed for unqualified object names
    #[serde(default = "default_schema")]
    pub default_schema: String,

    /// SQL dialect scripts are written in
    #[serde(default)]
    pub dialect: Dialect,

    /// Which rebuilt objects force their dependents to rebuild
    #[serde(default)]
    pub expansion: ExpansionPolicy,

    /// Version control settings
    #[serde(default)]
    pub git: GitConfig,

    /// Execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Target databases
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
}

/// SQL dialect for parsing scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// DuckDB SQL (default)
    #[default]
    DuckDb,
    /// ANSI SQL without vendor extensions
    Generic,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::DuckDb => write!(f, "duckdb"),
            Dialect::Generic => write!(f, "generic"),
        }
    }
}

/// Settings for the git executable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitConfig {
    /// Executable name or path
    #[serde(default = "default_git_executable")]
    pub executable: String,

    /// Timeout for a single git invocation
    #[serde(default = "default_git_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: default_git_executable(),
            timeout_secs: default_git_timeout_secs(),
        }
    }
}

impl GitConfig {
    /// Timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for applying build plans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Per-item timeout; unlimited when unset
    #[serde(default)]
    pub item_timeout_secs: Option<u64>,
}

impl ExecutionConfig {
    /// Per-item timeout as a [`Duration`]
    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_secs.map(Duration::from_secs)
    }
}

/// A named target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Name used on the command line
    pub name: String,

    /// Database file path, relative to the project directory, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_scripts_path() -> String {
    "sql".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["sql".to_string()]
}

fn default_schema() -> String {
    "main".to_string()
}

fn default_git_executable() -> String {
    "git".to_string()
}

fn default_git_timeout_secs() -> u64 {
    120
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for schemabuild.yml or schemabuild.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
        {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.extensions.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one script extension must be specified".to_string(),
            });
        }

        if self.default_schema.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "default_schema cannot be empty".to_string(),
            });
        }

        if self.git.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "git.timeout_secs must be greater than zero".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for db in &self.databases {
            if db.name.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "Database name cannot be empty".to_string(),
                });
            }
            if !seen.insert(db.name.as_str()) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Database '{}' is configured more than once", db.name),
                });
            }
        }

        Ok(())
    }

    /// Look up a configured database by name
    pub fn database(&self, name: &str) -> CoreResult<&DatabaseConfig> {
        self.databases
            .iter()
            .find(|db| db.name == name)
            .ok_or_else(|| CoreError::DatabaseNotFound {
                name: name.to_string(),
            })
    }

    /// Whether a repository-relative path has one of the script extensions
    pub fn is_script_path(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl DatabaseConfig {
    /// Whether the database lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    /// Database path resolved against the project directory
    pub fn path_absolute(&self, root: &Path) -> PathBuf {
        if self.is_in_memory() {
            PathBuf::from(&self.path)
        } else {
            root.join(&self.path)
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
