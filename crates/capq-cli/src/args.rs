//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::commands::Command;

/// capq - bounded packet capture queue
///
/// Captures frames from a network interface, filters them, and buffers them
/// in a fixed-capacity queue with a configurable overflow policy.
#[derive(Parser, Debug)]
#[command(name = "capq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "CAPQ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn test_verbose() {
        let args = Args::parse_from(["capq", "-v", "interfaces"]);
        assert_eq!(args.verbose, 1);

        let args = Args::parse_from(["capq", "interfaces", "-vvv"]);
        assert_eq!(args.verbose, 3);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["capq", "-q", "-v", "interfaces"]).is_err());
    }

    #[test]
    fn test_global_config() {
        let args = Args::parse_from(["capq", "run", "--config", "capq.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("capq.toml")));
        assert!(matches!(args.command, Command::Run(_)));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["capq"]).is_err());
    }
}
