// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the metadata engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the metadata engine
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the metadata engine
#[derive(Error, Debug)]
pub enum Error {
    /// The string is not a `MID:` identifier, or has an unusable shape
    #[error("malformed metadata identifier: {0}")]
    MalformedIdentifier(String),

    /// A class-level identifier was used where an instance is required
    #[error("not a metadata instance identifier: {0}")]
    NotAnInstance(String),

    /// No provider is registered for the identifier's metadata class
    #[error("no metadata provider registered for {0}")]
    NoProvider(String),

    /// The cached or computed item is not of the requested type
    #[error("metadata {id} is not of the requested type")]
    UnexpectedItemType {
        /// Identifier of the item
        id: String,
    },

    /// A provider failed while computing a metadata item
    #[error("provider failed to compute {id}")]
    Provider {
        /// Identifier being computed
        id: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// File system failure on a specific path
    #[error("I/O error on {path:?}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Invalid glob built from a governor name
    #[error(transparent)]
    Glob(#[from] globset::Error),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
