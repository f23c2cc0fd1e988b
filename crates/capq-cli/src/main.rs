//! capq CLI
//!
//! Command-line front end for the bounded packet capture queue.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use capq_core::Config;
use clap::Parser;
use tracing::error;

use args::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    // Logging comes up before the command loads its config, so the
    // [logging] section is read leniently here; the command reports errors.
    let file_config = commands::config::find_config_file(args.config.as_deref())
        .and_then(|path| Config::load(path).ok());
    let _guard = logging::init(&args, file_config.as_ref().map(|c| &c.logging))?;

    let result = run(args);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args) -> Result<()> {
    let config = args.config.as_deref();
    match args.command {
        commands::Command::Run(run_args) => {
            if !args.quiet && !run_args.json {
                print_banner();
            }
            commands::run::execute(run_args, config)
        }
        commands::Command::Interfaces(if_args) => commands::interfaces::execute(if_args),
        commands::Command::Config(config_args) => commands::config::execute(config_args, config),
        commands::Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!(
        "{} {}",
        "capq".green().bold(),
        concat!("v", env!("CARGO_PKG_VERSION")).white()
    );
    println!("{}", "bounded packet capture queue".dimmed());
    println!();
}
