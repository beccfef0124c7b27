//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Check links against threat feeds, reputation services and heuristics
///
/// Sources without an API key are skipped and reported as unavailable.
/// Keys come from the config file or VT_API_KEY,
/// GOOGLE_SAFE_BROWSING_API_KEY and URLSCAN_API_KEY.
#[derive(Parser, Debug)]
#[command(name = "linkguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "LINKGUARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding feed snapshots
    #[arg(long, env = "LINKGUARD_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assess the risk of a URL
    Check(CheckArgs),

    /// Download or inspect the local threat feeds
    Feeds(FeedsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// URL to assess (https:// is assumed without a scheme)
    pub url: String,

    /// Ignore any cached verdict
    #[arg(long)]
    pub force: bool,

    /// Run deep analysis even when the risk is not high
    #[arg(long, conflicts_with = "no_deep")]
    pub deep: bool,

    /// Never submit the URL for deep analysis
    #[arg(long)]
    pub no_deep: bool,

    /// Download the feeds before checking
    #[arg(long)]
    pub refresh_feeds: bool,
}

// ============================================================================
// Feeds command
// ============================================================================

#[derive(Args, Debug)]
pub struct FeedsArgs {
    #[command(subcommand)]
    pub command: FeedsCommands,
}

#[derive(Subcommand, Debug)]
pub enum FeedsCommands {
    /// Download every enabled feed now
    Refresh,

    /// Show snapshot age, size and failures per feed
    Status,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration (API keys masked)
    Show,

    /// Set a configuration value
    Set {
        /// Dotted key (e.g., virustotal.api_key)
        key: String,
        /// Value to set
        value: String,
    },

    /// Show the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deep_flags_conflict() {
        let err = Cli::try_parse_from(["linkguard", "check", "a.example", "--deep", "--no-deep"]);
        assert!(err.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["linkguard", "check", "a.example", "-o", "json", "--force"])
                .unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert!(args.force);
        assert_eq!(args.url, "a.example");
    }
}
