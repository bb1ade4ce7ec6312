//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Wikimig - brings wiki stores up to date on startup
#[derive(Parser, Debug)]
#[command(name = "wm")]
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
    /// Run the startup sequence: create, sync and migrate the stores
    Migrate(MigrateArgs),

    /// Show the current version and the pending migrations
    Status(StatusArgs),

    /// Print the changelogs the pending migrations would apply
    Changelog(ChangelogArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Only migrate this wiki (default: all, main wiki first)
    #[arg(short, long)]
    pub wiki: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only report this wiki
    #[arg(short, long)]
    pub wiki: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable summary
    Text,
    /// JSON report per wiki
    Json,
}

/// Arguments for the changelog command
#[derive(Args, Debug)]
pub struct ChangelogArgs {
    /// Only render this wiki
    #[arg(short, long)]
    pub wiki: Option<String>,

    /// Which schema pass to print
    #[arg(long, value_enum, default_value = "all")]
    pub pass: ChangelogPass,
}

/// Schema passes of a migration run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogPass {
    /// Changes applied before the schema sync
    Pre,
    /// Changes applied after the schema sync
    Schema,
    /// Both passes
    All,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
