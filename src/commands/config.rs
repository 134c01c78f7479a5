// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - shows the effective configuration and where it comes from

use super::GlobalOptions;
use crate::config::{user_config_file, PROJECT_FILE};
use anyhow::{Context, Result};
use serde_json::json;

/// Run the config command
pub fn run(options: &GlobalOptions, action: &str) -> Result<()> {
    match action {
        "show" => show(options),
        "path" => path(options),
        _ => anyhow::bail!("Unknown config action: {}. Use: show, path", action),
    }
}

fn show(options: &GlobalOptions) -> Result<()> {
    let config = options.load_config()?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
    }
    Ok(())
}

fn path(options: &GlobalOptions) -> Result<()> {
    let config = options.load_config()?;
    let user = user_config_file();
    let project = config.root.join(PROJECT_FILE);

    if options.json {
        let paths = json!({
            "user": user,
            "project": project,
            "explicit": options.config,
        });
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    match user {
        Some(user) => println!("user:     {}", user.display()),
        None => println!("user:     (no home directory)"),
    }
    println!("project:  {}", project.display());
    if let Some(explicit) = &options.config {
        println!("explicit: {}", explicit.display());
    }
    Ok(())
}
