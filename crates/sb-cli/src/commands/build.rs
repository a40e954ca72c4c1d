//! Build command implementation

use anyhow::{Context, Result};
use sb_build::{run_build, BuildMode, BuildReport, BuildRequest};
use serde::Serialize;

use crate::cli::{BuildArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{print_plan, PlanSummary};
use crate::context::ProjectContext;

#[derive(Debug, Serialize)]
struct BuildOutput<'a> {
    database: &'a str,
    plan: PlanSummary,
    applied: usize,
    skipped: usize,
    baseline: Option<String>,
}

/// Execute the build command
pub async fn execute(args: &BuildArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = ProjectContext::load(global)?;
    let name = args.target.database.as_str();
    let database = ctx.open_database(name)?;
    let repository = ctx.repository().await?;
    let parser = ctx.parser();

    let response = run_build(BuildRequest {
        repository: &repository,
        parser: &parser,
        database: &database,
        target: args.target.revision.clone(),
        policy: ctx.config.expansion,
        mode: BuildMode::Build,
        options: ctx.execute_options(),
    })
    .await
    .with_context(|| {
        format!(
            "Build of database '{}' failed; no changes were committed",
            name
        )
    })?;

    let report = response
        .report
        .clone()
        .unwrap_or_else(|| BuildReport::empty(response.plan.target.clone()));
    if let Some(setting) = &response.setting {
        ctx.save_setting(setting)?;
    }
    let baseline = response
        .setting
        .as_ref()
        .and_then(|s| s.baseline_revision())
        .map(ToString::to_string);

    match args.output {
        OutputFormat::Json => {
            let output = BuildOutput {
                database: name,
                plan: PlanSummary::from(&response.plan),
                applied: report.applied,
                skipped: report.skipped,
                baseline,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            print_plan(&response.plan, OutputFormat::Table)?;
            println!();
            println!(
                "Built '{}': {} applied, {} skipped",
                name, report.applied, report.skipped
            );
            if let Some(baseline) = baseline {
                println!("Baseline is now {}", baseline);
            }
        }
    }
    Ok(())
}
