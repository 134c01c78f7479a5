// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status command - scans the project and reports engine counters

use super::GlobalOptions;
use crate::engine::Engine;
use anyhow::Result;
use owo_colors::OwoColorize;

/// Run the status command
pub fn run(options: &GlobalOptions) -> Result<()> {
    let config = options.load_config()?;
    let engine = Engine::new(config);
    engine.scan();
    let status = engine.status();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let heading = |text: &str| {
        if options.color() {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    };

    println!("{}", heading("Project"));
    println!("  root: {}", engine.layout().root().display());
    for (path, dir) in engine.layout().source_directories() {
        println!("  {path}: {}", dir.display());
    }

    println!("{}", heading("Dependencies"));
    println!("  identifiers: {}", status.registry.nodes);
    println!("  edges:       {}", status.registry.edges);
    println!("  listeners:   {}", status.registry.listeners);

    println!("{}", heading("Cache"));
    println!("  items:  {}/{}", status.cache.len, status.cache.capacity);
    println!("  hits:   {}", status.cache.hits);
    println!("  misses: {}", status.cache.misses);

    println!("{}", heading("Files"));
    println!("  created:   {}", status.files.created);
    println!("  updated:   {}", status.files.updated);
    println!("  deleted:   {}", status.files.deleted);
    println!("  unchanged: {}", status.files.skipped);

    if !status.providers.is_empty() {
        println!("{}", heading("Providers"));
        for timing in &status.providers {
            println!(
                "  {} {} calls, {} us",
                timing.provider, timing.invocations, timing.total_micros
            );
        }
    }

    engine.shutdown();
    Ok(())
}
