//! Config command - configuration management

use anyhow::{bail, Context, Result};
use capq_core::config::Config;
use capq_core::interface::PLATFORM_DEFAULT;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File names probed in the working directory, in order
const LOCAL_CANDIDATES: [&str; 2] = ["capq.toml", "config.toml"];

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "capq.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate (default: the detected one)
        file: Option<PathBuf>,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(explicit),
        ConfigAction::Generate { output, force } => generate_config(&output, force),
        ConfigAction::Validate { file } => validate_config(file.as_deref().or(explicit)),
        ConfigAction::Paths => show_paths(),
    }
}

/// Load the explicit file, else the first detected one, else defaults
pub fn load_effective(explicit: Option<&Path>) -> Result<Config> {
    match find_config_file(explicit) {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Resolve which config file applies, if any
///
/// An explicit path is returned as-is so a missing file is reported rather
/// than silently replaced by defaults.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    for name in LOCAL_CANDIDATES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }

    user_config_path().filter(|path| path.exists())
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "capq").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn show_config(explicit: Option<&Path>) -> Result<()> {
    let config = load_effective(explicit)?;
    let toml_str = config.to_toml().context("Failed to serialize config")?;
    println!("{toml_str}");
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let toml_str = Config::default()
        .to_toml()
        .context("Failed to serialize config")?;

    let content = format!(
        "# capq configuration\n\
         # Unset keys fall back to the values shown here.\n\
         # Filters are added as [[filters]] tables with a name and a rule, e.g.\n\
         #   [[filters]]\n\
         #   name = \"no-arp\"\n\
         #   rule = {{ not = {{ protocol = \"arp\" }} }}\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());

    Ok(())
}

fn validate_config(file: Option<&Path>) -> Result<()> {
    let Some(path) = find_config_file(file) else {
        bail!("No configuration file found (see `capq config paths`)");
    };

    let config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.validate().context("Configuration validation failed")?;

    println!("{} Configuration is valid: {}", "✓".green(), path.display());
    println!(
        "  Interface: {}",
        config
            .requested_interface()
            .and_then(|r| r.as_name())
            .unwrap_or(PLATFORM_DEFAULT)
    );
    println!("  Queue capacity: {}", config.queue.capacity);
    println!("  Drop strategy: {}", config.queue.drop_strategy);
    println!("  Filters: {}", config.filters.len());

    Ok(())
}

fn show_paths() -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    println!("  0. --config <FILE> or $CAPQ_CONFIG");
    for (i, name) in LOCAL_CANDIDATES.iter().enumerate() {
        println!("  {}. ./{name}", i + 1);
    }
    if let Some(path) = user_config_path() {
        println!("  {}. {}", LOCAL_CANDIDATES.len() + 1, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/nonexistent/capq.toml");
        assert_eq!(find_config_file(Some(&path)), Some(path));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = load_effective(Some(Path::new("/nonexistent/capq.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_generate_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capq.toml");

        generate_config(&path, false).unwrap();
        assert!(generate_config(&path, false).is_err());
        generate_config(&path, true).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.queue.capacity, 4096);
    }
}
