// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Watch command - keeps ITDs current while sources change

use super::GlobalOptions;
use crate::engine::Engine;
use crate::monitor::{FileEvent, FileOperation};
use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run the watch command until the watcher shuts down
pub fn run(options: &GlobalOptions) -> Result<()> {
    let config = options.load_config()?;
    let debounce = Duration::from_millis(config.watch_debounce_ms);
    let engine = Engine::new(config);
    engine.scan();

    let directories = engine.watch_directories();
    if directories.is_empty() {
        anyhow::bail!(
            "No source directories found under {}",
            engine.layout().root().display()
        );
    }

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(debounce, tx).context("Failed to start file watcher")?;
    for dir in &directories {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        info!("Watching {}", dir.display());
    }
    if !options.json {
        println!("Watching {} source directories, Ctrl-C to stop", directories.len());
    }

    for result in rx {
        match result {
            Ok(events) => dispatch(&engine, &events),
            Err(e) => warn!("Watch error: {}", e),
        }
    }

    engine.shutdown();
    Ok(())
}

/// Debounced events only say "something happened"; existence decides the kind
fn dispatch(engine: &Engine, events: &[DebouncedEvent]) {
    debug!("{} debounced events", events.len());
    for event in events {
        let operation = if event.path.exists() {
            FileOperation::Updated
        } else {
            FileOperation::Deleted
        };
        engine.handle_event(&FileEvent::new(&event.path, operation));
    }
}
