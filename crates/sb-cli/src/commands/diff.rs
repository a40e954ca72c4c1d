//! Diff command implementation

use anyhow::{Context, Result};
use sb_core::ChangeKind;
use sb_repo::ScriptRepository;
use serde::Serialize;

use crate::cli::{DiffArgs, GlobalArgs, OutputFormat};
use crate::commands::common::print_table;
use crate::context::ProjectContext;

#[derive(Debug, Serialize)]
struct DiffEntry {
    path: String,
    change: ChangeKind,
}

/// Execute the diff command
pub async fn execute(args: &DiffArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    let setting = ctx.setting(&args.target.database)?;
    let repository = ctx.repository().await?;

    let changes = repository
        .diff(setting.baseline_revision(), &args.target.revision)
        .await
        .with_context(|| {
            format!(
                "Failed to diff scripts for database '{}'",
                args.target.database
            )
        })?;

    let entries: Vec<DiffEntry> = changes
        .iter()
        .map(|c| DiffEntry {
            path: c.path().to_string(),
            change: c.kind(),
        })
        .collect();

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            let from = setting
                .baseline_revision()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(none)".to_string());
            println!("Changes from {} to {}", from, args.target.revision);
            println!();
            if entries.is_empty() {
                println!("No script changes");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| vec![e.change.to_string(), e.path.clone()])
                .collect();
            print_table(&["CHANGE", "PATH"], &rows);
        }
    }
    Ok(())
}
