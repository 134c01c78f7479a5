// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Physical type metadata: what a governor's `.java` file declares

use crate::id::{MetadataId, PhysicalTypeIdentifier};
use crate::itd::reconcile::fingerprint;
use crate::itd::{itd_file_name, FileManager, ITD_MARKER};
use crate::project::ProjectLayout;
use crate::scanner;
use crate::service::{MetadataItem, MetadataProvider, MetadataService};
use crate::types::{ClassOrInterfaceTypeDetails, JavaType, LogicalPath, PhysicalTypeCategory};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A governor as found on disk
#[derive(Debug, Clone)]
pub struct PhysicalTypeMetadata {
    id: MetadataId,
    path: LogicalPath,
    java_type: JavaType,
    location: PathBuf,
    details: Option<ClassOrInterfaceTypeDetails>,
    fingerprint: String,
}

impl PhysicalTypeMetadata {
    /// Metadata for a scanned source file
    #[must_use]
    pub fn new(
        id: MetadataId,
        path: LogicalPath,
        java_type: JavaType,
        location: PathBuf,
        source: &str,
    ) -> Self {
        let details = scanner::scan_source(&java_type, source);
        Self {
            id,
            path,
            java_type,
            location,
            details,
            fingerprint: fingerprint(source),
        }
    }

    /// Logical path the type lives in
    #[must_use]
    pub fn logical_path(&self) -> &LogicalPath {
        &self.path
    }

    /// The declared type
    #[must_use]
    pub fn java_type(&self) -> &JavaType {
        &self.java_type
    }

    /// The `.java` file
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Scanned details; `None` when the file does not declare the expected type
    #[must_use]
    pub fn details(&self) -> Option<&ClassOrInterfaceTypeDetails> {
        self.details.as_ref()
    }

    /// Whether the governor is declared as a class
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.details
            .as_ref()
            .is_some_and(|d| d.category == PhysicalTypeCategory::Class)
    }

    /// Where the ITD with the given suffix belongs
    #[must_use]
    pub fn itd_canonical_path(&self, suffix: &str) -> PathBuf {
        self.location
            .with_file_name(itd_file_name(self.java_type.simple_name(), suffix))
    }

    /// The aspect type of the ITD with the given suffix
    #[must_use]
    pub fn itd_java_type(&self, suffix: &str) -> JavaType {
        self.java_type
            .sibling(&format!("{}{ITD_MARKER}{suffix}", self.java_type.simple_name()))
    }
}

impl MetadataItem for PhysicalTypeMetadata {
    fn id(&self) -> &MetadataId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        self.details.is_some()
    }

    fn fingerprint(&self) -> Option<String> {
        Some(self.fingerprint.clone())
    }
}

/// Reads governors from the project's source roots
pub struct PhysicalTypeMetadataProvider {
    layout: ProjectLayout,
    files: Arc<dyn FileManager>,
}

impl PhysicalTypeMetadataProvider {
    /// Provider reading through `files`
    #[must_use]
    pub fn new(layout: ProjectLayout, files: Arc<dyn FileManager>) -> Self {
        Self { layout, files }
    }
}

impl MetadataProvider for PhysicalTypeMetadataProvider {
    fn provides_type(&self) -> MetadataId {
        PhysicalTypeIdentifier::class_id()
    }

    fn get(
        &self,
        _service: &MetadataService,
        id: &MetadataId,
    ) -> anyhow::Result<Option<Arc<dyn MetadataItem>>> {
        let (path, java_type) = PhysicalTypeIdentifier::parse(id)?;
        let Some(location) = self.layout.source_file(&path, &java_type) else {
            debug!("No source root for {}", id);
            return Ok(None);
        };
        if !self.files.exists(&location) {
            return Ok(None);
        }
        let source = self
            .files
            .read_to_string(&location)
            .with_context(|| format!("reading governor {}", location.display()))?;

        Ok(Some(Arc::new(PhysicalTypeMetadata::new(
            id.clone(),
            path,
            java_type,
            location,
            &source,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::itd::DiskFileManager;
    use crate::project::{default_source_roots, SRC_MAIN_JAVA};
    use crate::registry::DependencyRegistry;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<MetadataService>) {
        let dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(dir.path(), default_source_roots());
        let registry = Arc::new(DependencyRegistry::new());
        let service = MetadataService::new(registry, MetadataCache::default());
        service.register_provider(Arc::new(PhysicalTypeMetadataProvider::new(
            layout,
            Arc::new(DiskFileManager),
        )));
        (dir, service)
    }

    fn pt_id() -> MetadataId {
        let java_type = JavaType::new("com.example.Bar");
        PhysicalTypeIdentifier::create(&java_type, &LogicalPath::new(SRC_MAIN_JAVA)).unwrap()
    }

    #[test]
    fn test_missing_file_is_absent() {
        let (_dir, service) = setup();
        assert!(service.get(&pt_id()).unwrap().is_none());
    }

    #[test]
    fn test_reads_and_scans_governor() {
        let (dir, service) = setup();
        let file = dir.path().join("src/main/java/com/example/Bar.java");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "package com.example;\npublic class Bar { private int size; }\n").unwrap();

        let pt = service.get_as::<PhysicalTypeMetadata>(&pt_id()).unwrap().unwrap();
        assert!(pt.is_class());
        assert!(pt.is_valid());
        assert_eq!(pt.location(), file.as_path());
        assert_eq!(pt.details().unwrap().fields[0].name, "size");
        assert_eq!(pt.itd_canonical_path("JavaBean"), file.with_file_name("Bar_Roo_JavaBean.aj"));
        assert_eq!(pt.itd_java_type("JavaBean"), JavaType::new("com.example.Bar_Roo_JavaBean"));
    }

    #[test]
    fn test_fingerprint_follows_source() {
        let scan = |source: &str| {
            PhysicalTypeMetadata::new(
                pt_id(),
                LogicalPath::new(SRC_MAIN_JAVA),
                JavaType::new("com.example.Bar"),
                PathBuf::from("Bar.java"),
                source,
            )
        };
        assert_ne!(scan("class Bar {}").fingerprint(), scan("class Bar { int x; }").fingerprint());
        assert!(!scan("class Other {}").is_valid());
    }
}
