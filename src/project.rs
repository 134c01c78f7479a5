// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Mapping between logical paths and directories on disk

use crate::itd::JAVA_EXTENSION;
use crate::types::{JavaType, LogicalPath};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Logical path of main sources
pub const SRC_MAIN_JAVA: &str = "SRC_MAIN_JAVA";

/// Logical path of test sources
pub const SRC_TEST_JAVA: &str = "SRC_TEST_JAVA";

/// The default source roots of a Maven-style project
#[must_use]
pub fn default_source_roots() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([
        (SRC_MAIN_JAVA.to_string(), PathBuf::from("src/main/java")),
        (SRC_TEST_JAVA.to_string(), PathBuf::from("src/test/java")),
    ])
}

/// Where a project's sources live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    source_roots: BTreeMap<String, PathBuf>,
}

impl ProjectLayout {
    /// Layout rooted at `root`; source root names are upper-cased
    pub fn new(root: impl Into<PathBuf>, source_roots: BTreeMap<String, PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_roots: source_roots
                .into_iter()
                .map(|(name, dir)| (name.to_uppercase(), dir))
                .collect(),
        }
    }

    /// Project root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a logical path, `None` for an unknown root
    #[must_use]
    pub fn directory(&self, path: &LogicalPath) -> Option<PathBuf> {
        let dir = self.source_roots.get(&path.root)?;
        let base = match &path.module {
            Some(module) => self.root.join(module),
            None => self.root.clone(),
        };
        Some(base.join(dir))
    }

    /// Root-module source directories, in logical path order
    #[must_use]
    pub fn source_directories(&self) -> Vec<(LogicalPath, PathBuf)> {
        self.source_roots
            .iter()
            .map(|(name, dir)| (LogicalPath::new(name.as_str()), self.root.join(dir)))
            .collect()
    }

    /// The `.java` file declaring a type
    #[must_use]
    pub fn source_file(&self, path: &LogicalPath, java_type: &JavaType) -> Option<PathBuf> {
        let mut file = self.directory(path)?;
        for segment in java_type.package().split('.').filter(|s| !s.is_empty()) {
            file.push(segment);
        }
        file.push(format!("{}.{JAVA_EXTENSION}", java_type.simple_name()));
        Some(file)
    }

    /// Logical path and type declared by a `.java` file under a source root
    #[must_use]
    pub fn resolve(&self, file: &Path) -> Option<(LogicalPath, JavaType)> {
        if file.extension()?.to_str()? != JAVA_EXTENSION {
            return None;
        }
        let relative = file.strip_prefix(&self.root).ok()?;

        for (name, dir) in &self.source_roots {
            if let Ok(rest) = relative.strip_prefix(dir) {
                return type_of(rest).map(|t| (LogicalPath::new(name.as_str()), t));
            }
            // <module>/<dir>/...
            let mut components = relative.components();
            let Some(Component::Normal(module)) = components.next() else {
                continue;
            };
            if let Ok(rest) = components.as_path().strip_prefix(dir) {
                let logical = LogicalPath {
                    module: Some(module.to_string_lossy().into_owned()),
                    root: name.clone(),
                };
                return type_of(rest).map(|t| (logical, t));
            }
        }
        None
    }
}

fn type_of(relative: &Path) -> Option<JavaType> {
    let stem = relative.file_stem()?.to_str()?;
    let mut segments = Vec::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            let Component::Normal(segment) = component else {
                return None;
            };
            segments.push(segment.to_str()?.to_string());
        }
    }
    segments.push(stem.to_string());
    Some(JavaType::new(segments.join(".")))
}
