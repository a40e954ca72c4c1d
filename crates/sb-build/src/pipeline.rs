//! The diff, plan, execute pipeline for one request

use log::{info, warn};
use sb_core::{BuildPlan, DatabaseSetting, ExpansionPolicy, RevisionId, ScriptParser};
use sb_repo::ScriptRepository;
use serde::Serialize;

use crate::error::{BuildError, BuildResult};
use crate::executor::{BuildReport, ExecuteOptions};
use crate::target::TargetDatabase;

/// How far a request goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Plan only
    Update,
    /// Plan and execute
    Build,
}

/// Inputs of one build request
pub struct BuildRequest<'a> {
    pub repository: &'a dyn ScriptRepository,
    pub parser: &'a dyn ScriptParser,
    pub database: &'a TargetDatabase,
    pub target: RevisionId,
    pub policy: ExpansionPolicy,
    pub mode: BuildMode,
    pub options: ExecuteOptions,
}

/// Outputs of one build request
#[derive(Debug, Clone, Serialize)]
pub struct BuildResponse {
    /// The ordered plan
    pub plan: BuildPlan,

    /// Execution summary; `None` in update mode
    pub report: Option<BuildReport>,

    /// The database setting with its new baseline after a committed build
    pub setting: Option<DatabaseSetting>,
}

/// Diff, plan, and optionally execute.
///
/// Cancellation is checked between phases and between items. The database
/// setting is never modified in place; a committed build returns the
/// updated setting for the caller to persist.
pub async fn run_build(request: BuildRequest<'_>) -> BuildResult<BuildResponse> {
    let cancelled = || request.options.cancellation.is_cancelled();
    if cancelled() {
        return Err(BuildError::Cancelled { completed: 0 });
    }

    let plan = request
        .database
        .changed_build_items(
            request.repository,
            request.parser,
            &request.target,
            request.policy,
        )
        .await?;

    if request.mode == BuildMode::Update {
        return Ok(BuildResponse {
            plan,
            report: None,
            setting: None,
        });
    }
    if cancelled() {
        return Err(BuildError::Cancelled { completed: 0 });
    }

    let recorded = baseline_revision(request.repository, &plan.target).await?;
    let report = request.database.build(&plan, &request.options).await?;
    let setting = request.database.setting().with_baseline(recorded);
    info!(
        "Baseline of '{}' is now {}",
        setting.name,
        setting
            .baseline_revision()
            .map(ToString::to_string)
            .unwrap_or_default()
    );

    Ok(BuildResponse {
        plan,
        report: Some(report),
        setting: Some(setting),
    })
}

/// Revision recorded as the baseline after building `target`
async fn baseline_revision(
    repository: &dyn ScriptRepository,
    target: &RevisionId,
) -> BuildResult<RevisionId> {
    if !target.is_working_copy() {
        return Ok(target.clone());
    }
    let head = repository.head().await?;
    warn!(
        "Built from the working copy; recording {} as the baseline. Uncommitted edits are not part of it",
        head
    );
    Ok(RevisionId::Changeset(head))
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
