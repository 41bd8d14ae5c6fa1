//! Clap derive structures for the `opensesame` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// opensesame -- open doors and gates through an ioBroker state store
#[derive(Debug, Parser)]
#[command(
    name = "opensesame",
    version,
    about = "Bridge an ioBroker state store to a small HTTP API",
    long_about = "Mirrors a set of ioBroker state points and serves them over HTTP.\n\n\
        GET /get returns the mirrored points, GET /open?id=<webId> writes\n\
        `true` to a point and returns the refreshed state.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file
    #[arg(long, short = 'c', env = "OPENSESAME_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// One identifier per line
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge and HTTP server until Ctrl-C or SIGTERM
    Serve(ServeArgs),

    /// List the points known to the store
    Points(PointsArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on (overrides server.port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Directory of static web assets (overrides server.static_dir)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

// ── Points ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PointsArgs {
    /// Show the full catalog instead of only the watched points
    #[arg(long, short = 'a')]
    pub all: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (password masked)
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn man_pages_cover_every_visible_subcommand() {
        let cmd = Cli::command();
        let visible: Vec<&str> = cmd
            .get_subcommands()
            .filter(|s| !s.is_hide_set())
            .map(clap::Command::get_name)
            .collect();
        assert_eq!(visible, ["serve", "points", "config", "completions"]);
    }
}
