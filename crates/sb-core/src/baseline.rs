//! Revision baselines and the state file that persists them per database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::DatabaseConfig;
use crate::error::{CoreError, CoreResult};
use crate::revision::RevisionId;

/// Directory (relative to the project) holding local state
pub const STATE_DIR: &str = ".schemabuild";

/// State file name inside [`STATE_DIR`]
pub const STATE_FILE: &str = "state.json";

/// The last revision successfully built into a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionBaseline {
    /// Revision that was built
    pub revision: RevisionId,

    /// When the build committed
    pub recorded_at: DateTime<Utc>,
}

impl RevisionBaseline {
    /// Baseline recorded now
    pub fn now(revision: RevisionId) -> Self {
        Self {
            revision,
            recorded_at: Utc::now(),
        }
    }
}

/// Everything needed to address one target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSetting {
    /// Configured database name
    pub name: String,

    /// Connection path (`:memory:` or a file path)
    pub path: String,

    /// Last committed build, `None` for a fresh database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<RevisionBaseline>,
}

impl DatabaseSetting {
    /// Setting without a baseline
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            baseline: None,
        }
    }

    /// Revision of the current baseline
    pub fn baseline_revision(&self) -> Option<&RevisionId> {
        self.baseline.as_ref().map(|b| &b.revision)
    }

    /// Copy of this setting with a new baseline
    pub fn with_baseline(&self, revision: RevisionId) -> Self {
        Self {
            baseline: Some(RevisionBaseline::now(revision)),
            ..self.clone()
        }
    }
}

/// Per-database baselines persisted between runs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateFile {
    /// When this state file was last updated
    pub updated_at: DateTime<Utc>,

    /// Baseline for each database, keyed by database name
    #[serde(default)]
    pub baselines: BTreeMap<String, RevisionBaseline>,
}

impl StateFile {
    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            updated_at: Utc::now(),
            baselines: BTreeMap::new(),
        }
    }

    /// Conventional state file location for a project directory
    pub fn default_path(project_dir: &Path) -> PathBuf {
        project_dir.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load state from a file path; a missing file is an empty state
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let state: StateFile = serde_json::from_str(&content)?;
        Ok(state)
    }

    /// Save state to a file path atomically
    ///
    /// Writes to a PID-suffixed temp file, then renames over the target.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::IoWithPath {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&temp_path, &json).map_err(|e| CoreError::IoWithPath {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    /// Baseline of a database
    pub fn baseline(&self, database: &str) -> Option<&RevisionBaseline> {
        self.baselines.get(database)
    }

    /// Record or replace a database's baseline
    pub fn set_baseline(&mut self, database: impl Into<String>, baseline: RevisionBaseline) {
        self.baselines.insert(database.into(), baseline);
        self.updated_at = Utc::now();
    }

    /// Forget a database's baseline; returns the removed value
    pub fn clear_baseline(&mut self, database: &str) -> Option<RevisionBaseline> {
        let removed = self.baselines.remove(database);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Combine a configured database with its recorded baseline
    pub fn setting_for(&self, db: &DatabaseConfig, project_dir: &Path) -> DatabaseSetting {
        DatabaseSetting {
            name: db.name.clone(),
            path: db.path_absolute(project_dir).display().to_string(),
            baseline: self.baseline(&db.name).cloned(),
        }
    }

    /// Store the baseline carried by a setting (clearing it when absent)
    pub fn apply(&mut self, setting: &DatabaseSetting) {
        match &setting.baseline {
            Some(baseline) => self.set_baseline(setting.name.clone(), baseline.clone()),
            None => {
                self.clear_baseline(&setting.name);
            }
        }
    }
}

#[cfg(test)]
#[path = "baseline_test.rs"]
mod tests;
