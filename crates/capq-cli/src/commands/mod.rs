//! CLI commands

pub mod completions;
pub mod config;
pub mod interfaces;
pub mod run;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture packets into the bounded queue (main command)
    Run(run::RunArgs),

    /// List capture interfaces
    Interfaces(interfaces::InterfacesArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
