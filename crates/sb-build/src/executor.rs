//! Ordered execution of a build plan

use log::{debug, info};
use sb_core::{BuildActionType, BuildItem, BuildPlan, RevisionId};
use sb_db::{DbResult, ScriptExecutor};
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{BuildError, BuildResult};

/// Knobs for one execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Maximum time for a single item
    pub item_timeout: Option<Duration>,

    /// Checked before each item; a running item is never interrupted
    pub cancellation: CancellationToken,
}

impl ExecuteOptions {
    /// Limit each item to `timeout`
    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Stop before the next item once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Summary of a successful execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Revision the plan built towards
    pub target: RevisionId,

    /// Items whose statements ran
    pub applied: usize,

    /// Items planned as no-ops
    pub skipped: usize,
}

impl BuildReport {
    /// Report for a plan with nothing to run
    pub fn empty(target: RevisionId) -> Self {
        Self {
            target,
            applied: 0,
            skipped: 0,
        }
    }
}

/// Runs plan items strictly in order, one at a time.
///
/// Execution has two passes. The teardown pass walks `plan.teardown`,
/// running drops and taking down redefined objects, dependents first. The
/// creation pass then runs every remaining item in plan order.
///
/// The executor works inside whatever transaction the caller opened and
/// never begins, commits, or rolls back itself. The first failing step
/// stops the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildExecutor;

impl BuildExecutor {
    /// Execute every item of `plan` through `executor`
    pub async fn build(
        plan: &BuildPlan,
        executor: &dyn ScriptExecutor,
        options: &ExecuteOptions,
    ) -> BuildResult<BuildReport> {
        let mut report = BuildReport::empty(plan.target.clone());
        let total = plan.len();
        let mut dropped = BTreeSet::new();

        for (index, item) in plan.teardown_items() {
            if options.cancellation.is_cancelled() {
                info!("Build cancelled during teardown of {}", item.name());
                return Err(BuildError::Cancelled {
                    completed: report.applied,
                });
            }

            let position = index + 1;
            if item.action == BuildActionType::Drop {
                info!("[{}/{}] {}", position, total, item);
                let run = executor.execute(&item.object.sql, &item.object, item.action);
                run_step(run, position, item, options).await?;
                dropped.insert(index);
                report.applied += 1;
            } else if item.is_redefinition() {
                debug!("[{}/{}] take down {}", position, total, item.name());
                run_step(executor.teardown(&item.object), position, item, options).await?;
            }
        }

        for (index, item) in plan.items.iter().enumerate() {
            if dropped.contains(&index) {
                continue;
            }

            let position = index + 1;
            if options.cancellation.is_cancelled() {
                info!("Build cancelled before item {}/{}", position, total);
                return Err(BuildError::Cancelled {
                    completed: report.applied + report.skipped,
                });
            }

            if item.action == BuildActionType::NoOp {
                debug!("[{}/{}] skip {}", position, total, item.name());
                report.skipped += 1;
                continue;
            }

            info!("[{}/{}] {}", position, total, item);
            let run = executor.execute(&item.object.sql, &item.object, item.action);
            run_step(run, position, item, options).await?;
            report.applied += 1;
        }

        Ok(report)
    }
}

/// Await one step of `item` under the item timeout
async fn run_step(
    run: impl Future<Output = DbResult<()>>,
    position: usize,
    item: &BuildItem,
    options: &ExecuteOptions,
) -> BuildResult<()> {
    let result = match options.item_timeout {
        Some(timeout) => tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| BuildError::Timeout {
                position,
                object: item.name().clone(),
                action: item.action,
                timeout,
            })?,
        None => run.await,
    };

    result.map_err(|source| BuildError::ItemFailed {
        position,
        object: item.name().clone(),
        action: item.action,
        source,
    })
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
