// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Generate command - one pass over the project, bringing every ITD up to date

use super::GlobalOptions;
use crate::engine::{Engine, ScanSummary};
use crate::itd::reconcile::ReconcileStats;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct GenerateReport {
    scanned: ScanSummary,
    files: ReconcileStats,
}

/// Run the generate command
pub fn run(options: &GlobalOptions) -> Result<()> {
    let config = options.load_config()?;
    info!("Generating ITDs under {}", config.root.display());

    let engine = Engine::new(config);
    let scanned = engine.scan();
    let files = engine.reconciler().stats();
    engine.shutdown();

    if options.json {
        let report = GenerateReport { scanned, files };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Scanned {} Java files and {} ITD files",
        scanned.java_files, scanned.itd_files
    );
    if options.color() {
        println!(
            "  {} created, {} updated, {} deleted, {} unchanged",
            files.created.green(),
            files.updated.yellow(),
            files.deleted.red(),
            files.skipped.dimmed()
        );
    } else {
        println!(
            "  {} created, {} updated, {} deleted, {} unchanged",
            files.created, files.updated, files.deleted, files.skipped
        );
    }
    Ok(())
}
