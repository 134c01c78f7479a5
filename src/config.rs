// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Sources, later ones winning: built-in defaults, the user's config file,
//! `<root>/metaweave.toml`, an explicit `--config` file, then `METAWEAVE_*`
//! environment variables.

use crate::cache::DEFAULT_CAPACITY;
use crate::error::Result;
use crate::project::{default_source_roots, ProjectLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-project configuration file name
pub const PROJECT_FILE: &str = "metaweave.toml";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "METAWEAVE";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root
    pub root: PathBuf,
    /// Maximum metadata items cached
    pub cache_capacity: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Quiet period before a burst of file events is processed
    pub watch_debounce_ms: u64,
    /// Logical path name to directory, relative to the root
    pub source_roots: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cache_capacity: DEFAULT_CAPACITY,
            log_level: "info".to_string(),
            watch_debounce_ms: 500,
            source_roots: default_source_roots(),
        }
    }
}

impl Config {
    /// Source layout described by this configuration
    #[must_use]
    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.root, self.source_roots.clone())
    }

    /// The effective configuration as TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// The user-wide configuration file, when a home directory is known
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "metaweave", "metaweave")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration for a project root, layering every source
pub fn load(root: Option<&Path>, file: Option<&Path>) -> Result<Config> {
    let project_root = root.map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
    if let Some(user) = user_config_file() {
        builder = builder.add_source(config::File::from(user).required(false));
    }
    let project_file = project_root.join(PROJECT_FILE);
    builder = builder.add_source(config::File::from(project_file).required(false));
    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file).required(true));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let mut loaded: Config = builder.build()?.try_deserialize()?;
    if root.is_some() {
        loaded.root = project_root;
    }
    Ok(loaded)
}
