// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod generate;
pub mod graph;
pub mod id;
pub mod status;
pub mod watch;

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Project root override
    pub root: Option<PathBuf>,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Emit JSON instead of text
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
}

impl GlobalOptions {
    /// Load the layered configuration these options point at
    pub fn load_config(&self) -> Result<Config> {
        crate::config::load(self.root.as_deref(), self.config.as_deref())
            .context("Failed to load configuration")
    }

    /// Whether text output may use color
    #[must_use]
    pub fn color(&self) -> bool {
        !self.json && !self.no_color
    }
}
