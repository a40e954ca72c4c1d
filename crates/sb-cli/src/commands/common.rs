//! Shared utilities for CLI commands

use anyhow::Result;
use sb_core::{BuildPlan, RevisionId};
use serde::Serialize;

use crate::cli::OutputFormat;

/// One plan row as shown to users
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PlanEntry {
    pub position: usize,
    pub action: String,
    pub kind: String,
    pub object: String,
    pub reason: String,
    pub script: String,
}

/// A plan without statement text
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PlanSummary {
    pub target: RevisionId,
    pub baseline: Option<RevisionId>,
    pub items: Vec<PlanEntry>,
    /// Objects removed before the items run, in removal order
    pub teardown: Vec<String>,
}

impl From<&BuildPlan> for PlanSummary {
    fn from(plan: &BuildPlan) -> Self {
        let items = plan
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| PlanEntry {
                position: i + 1,
                action: item.action.to_string(),
                kind: item.object.kind.to_string(),
                object: item.name().to_string(),
                reason: item.reason.to_string(),
                script: item.script.path.to_string(),
            })
            .collect();
        Self {
            target: plan.target.clone(),
            baseline: plan.baseline.clone(),
            items,
            teardown: plan.teardown.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Print a plan in the requested format
pub(crate) fn print_plan(plan: &BuildPlan, output: OutputFormat) -> Result<()> {
    let summary = PlanSummary::from(plan);
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            let from = summary
                .baseline
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(none)".to_string());
            println!("Plan from {} to {}", from, summary.target);
            println!();
            if summary.items.is_empty() {
                println!("Nothing to build");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = summary
                .items
                .iter()
                .map(|e| {
                    vec![
                        e.position.to_string(),
                        e.action.clone(),
                        e.kind.clone(),
                        e.object.clone(),
                        e.reason.clone(),
                        e.script.clone(),
                    ]
                })
                .collect();
            print_table(&["#", "ACTION", "KIND", "OBJECT", "REASON", "SCRIPT"], &rows);
            println!();
            if !summary.teardown.is_empty() {
                println!("Removed first: {}", summary.teardown.join(", "));
            }
            println!("{} item(s)", summary.items.len());
        }
    }
    Ok(())
}

/// Calculate column widths for table output.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
/// Columns are separated by two spaces.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::{
        BuildActionType, BuildItem, BuildReason, ObjectDescriptor, ObjectKind, ObjectName,
        ScriptFile,
    };

    #[test]
    fn test_column_widths() {
        let rows = vec![vec!["1".to_string(), "reporting.summary".to_string()]];
        assert_eq!(calculate_column_widths(&["#", "OBJECT"], &rows), vec![1, 17]);
    }

    #[test]
    fn test_plan_summary() {
        let sql = "CREATE VIEW v AS SELECT 1";
        let plan = BuildPlan {
            target: RevisionId::changeset("abc"),
            baseline: None,
            items: vec![BuildItem {
                object: ObjectDescriptor::new(
                    ObjectName::new("main", "v"),
                    ObjectKind::View,
                    BuildActionType::Create,
                    sql,
                ),
                script: ScriptFile::new("sql/v.sql", sql),
                action: BuildActionType::Alter,
                reason: BuildReason::DependencyChanged,
            }],
            teardown: vec![ObjectName::new("main", "v")],
        };

        let summary = PlanSummary::from(&plan);
        let entry = &summary.items[0];
        assert_eq!(entry.position, 1);
        assert_eq!(entry.action, "alter");
        assert_eq!(entry.kind, "view");
        assert_eq!(entry.object, "main.v");
        assert_eq!(entry.reason, "dependency changed");
        assert_eq!(entry.script, "sql/v.sql");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["target"]["changeset"], "abc");
        assert!(json["items"][0].get("sql").is_none());
        assert_eq!(json["teardown"][0], "main.v");
    }
}
