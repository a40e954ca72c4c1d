//! Database baseline commands

use anyhow::{bail, Result};
use sb_core::RevisionBaseline;

use crate::cli::{BaselineArgs, DbArgs, DbCommands, GlobalArgs};
use crate::commands::common::print_table;
use crate::context::ProjectContext;

/// Execute a db subcommand
pub async fn execute(args: &DbArgs, global: &GlobalArgs) -> Result<()> {
    match &args.command {
        DbCommands::List => list(global),
        DbCommands::Baseline(args) => baseline(args, global),
    }
}

fn list(global: &GlobalArgs) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    if ctx.config.databases.is_empty() {
        println!("No databases configured");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = ctx
        .config
        .databases
        .iter()
        .map(|db| {
            let setting = ctx.state.setting_for(db, &ctx.root);
            let (revision, recorded) = match &setting.baseline {
                Some(b) => (
                    b.revision.to_string(),
                    b.recorded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                ),
                None => ("-".to_string(), "-".to_string()),
            };
            vec![setting.name, setting.path, revision, recorded]
        })
        .collect();
    print_table(&["NAME", "PATH", "BASELINE", "RECORDED"], &rows);
    Ok(())
}

fn baseline(args: &BaselineArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = ProjectContext::load(global)?;
    ctx.config.database(&args.name)?;

    if args.clear {
        match ctx.state.clear_baseline(&args.name) {
            Some(old) => {
                ctx.save_state()?;
                println!("Cleared baseline of '{}' (was {})", args.name, old.revision);
            }
            None => println!("'{}' has no baseline", args.name),
        }
        return Ok(());
    }

    if let Some(revision) = &args.set {
        if revision.is_working_copy() {
            bail!("The working copy cannot be recorded as a baseline; use a changeset or tag");
        }
        ctx.state
            .set_baseline(args.name.clone(), RevisionBaseline::now(revision.clone()));
        ctx.save_state()?;
        println!("Baseline of '{}' is now {}", args.name, revision);
        return Ok(());
    }

    match ctx.state.baseline(&args.name) {
        Some(b) => println!(
            "{} (recorded {})",
            b.revision,
            b.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("'{}' has no baseline", args.name),
    }
    Ok(())
}
