// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph command - exports the metadata dependency graph

use super::GlobalOptions;
use crate::engine::Engine;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Supported graph formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON edge list
    Json,
}

impl GraphFormat {
    /// Parse format from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dot" | "graphviz" => Some(Self::Dot),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get file extension for format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Json => "json",
        }
    }
}

#[derive(Serialize)]
struct Edge<'a> {
    upstream: &'a str,
    downstream: &'a str,
}

/// Run the graph command
pub fn run(options: &GlobalOptions, format: &str, output: Option<PathBuf>) -> Result<()> {
    let graph_format = GraphFormat::from_str(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown graph format: {}. Supported: dot, json", format))?;
    // --json on the command line wins over --format
    let graph_format = if options.json { GraphFormat::Json } else { graph_format };
    info!("Exporting dependency graph as {}", graph_format.extension());

    let engine = Engine::new(options.load_config()?);
    engine.scan();

    let content = match graph_format {
        GraphFormat::Dot => engine.registry().to_dot(),
        GraphFormat::Json => {
            let dependencies = engine.registry().dependencies();
            let edges: Vec<Edge<'_>> = dependencies
                .iter()
                .map(|(upstream, downstream)| Edge {
                    upstream: upstream.as_str(),
                    downstream: downstream.as_str(),
                })
                .collect();
            serde_json::to_string_pretty(&edges)?
        }
    };
    engine.shutdown();

    match output {
        Some(path) => {
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
