//! Interfaces command - list capture interfaces

use anyhow::{Context, Result};
use capq_platform::{interface_details, pick_default, InterfaceInfo};
use clap::Args;
use colored::Colorize;
use serde_json::json;

/// Interfaces command arguments
#[derive(Args, Debug)]
pub struct InterfacesArgs {
    /// Include interfaces that are down
    #[arg(short, long)]
    pub all: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute interfaces command
pub fn execute(args: InterfacesArgs) -> Result<()> {
    let details = interface_details();
    let default = pick_default(&details).map(|iface| iface.name.clone());
    let shown: Vec<&InterfaceInfo> = details.iter().filter(|i| args.all || i.is_up).collect();

    if args.json {
        let list: Vec<_> = shown
            .iter()
            .map(|iface| {
                json!({
                    "name": iface.name,
                    "description": iface.description,
                    "mac": iface.mac,
                    "ips": iface.ips.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "up": iface.is_up,
                    "loopback": iface.is_loopback,
                    "default": default.as_deref() == Some(iface.name.as_str()),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&list).context("Failed to encode interfaces")?;
        println!("{out}");
        return Ok(());
    }

    if shown.is_empty() {
        println!("No interfaces found (platform: {})", capq_platform::platform_name());
        return Ok(());
    }

    for iface in shown {
        let marker = if default.as_deref() == Some(iface.name.as_str()) {
            "*".green().bold()
        } else {
            " ".normal()
        };
        let name = if iface.is_up {
            iface.name.bold()
        } else {
            iface.name.dimmed()
        };
        let mut flags = Vec::new();
        if !iface.is_up {
            flags.push("down");
        }
        if iface.is_loopback {
            flags.push("loopback");
        }

        println!(
            "{marker} {name:<16} {:<17} {}{}",
            iface.mac.as_deref().unwrap_or("-"),
            iface
                .ips
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            }
        );
    }

    if default.is_some() {
        println!();
        println!("{} default capture interface", "*".green().bold());
    }

    Ok(())
}
