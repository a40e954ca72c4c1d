//! Update command implementation: plan only

use anyhow::{Context, Result};
use sb_build::{run_build, BuildMode, BuildRequest, ExecuteOptions};

use crate::cli::{GlobalArgs, UpdateArgs};
use crate::commands::common::print_plan;
use crate::context::ProjectContext;

/// Execute the update command
pub async fn execute(args: &UpdateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    let database = ctx.open_database(&args.target.database)?;
    let repository = ctx.repository().await?;
    let parser = ctx.parser();

    let response = run_build(BuildRequest {
        repository: &repository,
        parser: &parser,
        database: &database,
        target: args.target.revision.clone(),
        policy: ctx.config.expansion,
        mode: BuildMode::Update,
        options: ExecuteOptions::default(),
    })
    .await
    .with_context(|| format!("Failed to plan database '{}'", args.target.database))?;

    print_plan(&response.plan, args.output)
}
