//! Runtime context for CLI commands

use anyhow::{Context, Result};
use sb_build::{ExecuteOptions, TargetDatabase};
use sb_core::{Config, DatabaseSetting, StateFile};
use sb_repo::GitScriptRepository;
use sb_sql::SqlScriptParser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalArgs;

/// Loaded project configuration and recorded baselines
pub struct ProjectContext {
    /// Project directory
    pub root: PathBuf,

    /// Project configuration
    pub config: Config,

    /// Where baselines are persisted
    pub state_path: PathBuf,

    /// Recorded baselines
    pub state: StateFile,
}

impl ProjectContext {
    /// Load configuration and state from global arguments
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&args.project_dir);

        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let state_path = StateFile::default_path(&root);
        let state = StateFile::load(&state_path)
            .with_context(|| format!("Failed to read state file {}", state_path.display()))?;

        Ok(Self {
            root,
            config,
            state_path,
            state,
        })
    }

    /// Setting (path and baseline) of a configured database
    pub fn setting(&self, database: &str) -> Result<DatabaseSetting> {
        let db = self.config.database(database)?;
        Ok(self.state.setting_for(db, &self.root))
    }

    /// Open a configured database
    pub fn open_database(&self, database: &str) -> Result<TargetDatabase> {
        let setting = self.setting(database)?;
        TargetDatabase::open(setting)
            .with_context(|| format!("Failed to open database '{}'", database))
    }

    /// Git repository holding the project's scripts
    pub async fn repository(&self) -> Result<GitScriptRepository> {
        GitScriptRepository::from_config(&self.root, &self.config)
            .await
            .context("Failed to open script repository")
    }

    /// SQL parser for the configured dialect and default schema
    pub fn parser(&self) -> SqlScriptParser {
        SqlScriptParser::from_config(&self.config)
    }

    /// Execution options from configuration, cancelled on Ctrl-C
    pub fn execute_options(&self) -> ExecuteOptions {
        let token = CancellationToken::new();
        let on_signal = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; stopping after the current item");
                on_signal.cancel();
            }
        });
        ExecuteOptions::default()
            .with_item_timeout(self.config.execution.item_timeout())
            .with_cancellation(token)
    }

    /// Record a database's new baseline and save the state file
    pub fn save_setting(&mut self, setting: &DatabaseSetting) -> Result<()> {
        self.state.apply(setting);
        self.save_state()
    }

    /// Save the state file
    pub fn save_state(&self) -> Result<()> {
        self.state
            .save(&self.state_path)
            .with_context(|| format!("Failed to write state file {}", self.state_path.display()))
    }
}
