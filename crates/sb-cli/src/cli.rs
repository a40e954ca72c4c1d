//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use sb_core::RevisionId;

/// Schemabuild - dependency-aware database builds from versioned SQL scripts
#[derive(Parser, Debug)]
#[command(name = "sb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List scripts changed since the database's baseline
    Diff(DiffArgs),

    /// Plan a build without touching the database
    Update(UpdateArgs),

    /// Plan and execute a build in one transaction
    Build(BuildArgs),

    /// Inspect or override recorded baselines
    Db(DbArgs),
}

/// Database and revision selection shared by diff, update, and build
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Configured database name
    #[arg(short, long)]
    pub database: String,

    /// Source revision: working, changeset:<hash>, or tag:<name>
    #[arg(short, long, default_value = "working")]
    pub revision: RevisionId,
}

/// Arguments for the diff command
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the db command
#[derive(Args, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommands,
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// List configured databases and their baselines
    List,

    /// Show, set, or clear a database's baseline
    Baseline(BaselineArgs),
}

/// Arguments for the db baseline command
#[derive(Args, Debug)]
pub struct BaselineArgs {
    /// Configured database name
    pub name: String,

    /// Record this revision as the baseline
    #[arg(long, conflicts_with = "clear")]
    pub set: Option<RevisionId>,

    /// Forget the baseline so the next build starts from scratch
    #[arg(long)]
    pub clear: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
