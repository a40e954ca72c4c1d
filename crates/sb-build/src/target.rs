//! A target database together with its recorded baseline

use log::{info, warn};
use sb_core::{
    BuildPlan, DatabaseSetting, ExpansionPolicy, PlanInput, Planner, RevisionId, ScriptParser,
};
use sb_db::{Database, DatabaseScriptExecutor, DuckDbBackend, Transaction};
use sb_repo::ScriptRepository;

use crate::error::BuildResult;
use crate::executor::{BuildExecutor, BuildReport, ExecuteOptions};

/// One database a project builds into.
///
/// Holds the connection and the setting (name, path, baseline) it was
/// opened from. Planning never writes to the database; building owns a
/// single transaction for the whole plan.
pub struct TargetDatabase {
    db: Box<dyn Database>,
    setting: DatabaseSetting,
}

impl TargetDatabase {
    /// Wrap an open database
    pub fn new(db: Box<dyn Database>, setting: DatabaseSetting) -> Self {
        Self { db, setting }
    }

    /// Open the DuckDB database the setting points at
    pub fn open(setting: DatabaseSetting) -> BuildResult<Self> {
        let db = DuckDbBackend::new(&setting.path)?;
        Ok(Self::new(Box::new(db), setting))
    }

    /// Database name, path, and baseline
    pub fn setting(&self) -> &DatabaseSetting {
        &self.setting
    }

    /// Keep the connection, replace the setting
    pub fn with_setting(mut self, setting: DatabaseSetting) -> Self {
        self.setting = setting;
        self
    }

    /// Underlying database handle
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// Plan the items needed to bring this database from its baseline to
    /// `target`. Nothing is written to the database.
    pub async fn changed_build_items(
        &self,
        repository: &dyn ScriptRepository,
        parser: &dyn ScriptParser,
        target: &RevisionId,
        policy: ExpansionPolicy,
    ) -> BuildResult<BuildPlan> {
        let target = repository.resolve(target).await?;
        let baseline = self.setting.baseline_revision().cloned();
        match &baseline {
            Some(rev) => info!("Database '{}' was last built from {}", self.setting.name, rev),
            None => info!("Database '{}' has no baseline; building everything", self.setting.name),
        }

        let changes = repository.diff(baseline.as_ref(), &target).await?;
        let scripts = repository.materialize(&target).await?;
        info!(
            "{} changed script(s) between {} and {}",
            changes.len(),
            baseline
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "nothing".to_string()),
            target
        );

        let plan = Planner::new(parser).with_policy(policy).plan(&PlanInput {
            target,
            baseline,
            changes: &changes,
            scripts: &scripts,
        })?;
        info!("Planned {} item(s) for '{}'", plan.len(), self.setting.name);
        Ok(plan)
    }

    /// Execute `plan` in one transaction.
    ///
    /// Commits when every item succeeds; otherwise rolls back and returns
    /// the failure.
    pub async fn build(&self, plan: &BuildPlan, options: &ExecuteOptions) -> BuildResult<BuildReport> {
        if plan.is_empty() {
            info!("Nothing to build for '{}'", self.setting.name);
            return Ok(BuildReport::empty(plan.target.clone()));
        }

        let tx = Transaction::begin(self.database()).await?;
        let executor = DatabaseScriptExecutor::new(tx.database());
        match BuildExecutor::build(plan, &executor, options).await {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    "Built '{}': {} applied, {} skipped",
                    self.setting.name, report.applied, report.skipped
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of '{}' failed: {}", self.setting.name, rollback);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "target_test.rs"]
mod tests;
