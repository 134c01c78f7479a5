// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! File events and the physical type monitor

use crate::id::{MetadataId, PhysicalTypeIdentifier};
use crate::project::ProjectLayout;
use crate::service::MetadataService;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Kind of change reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    /// A file appeared
    Created,
    /// A file's contents changed
    Updated,
    /// A file disappeared
    Deleted,
    /// A file moved; the event carries the previous path
    Renamed,
    /// The monitor started watching
    MonitoringStart,
    /// The monitor stopped watching
    MonitoringFinish,
}

/// One change on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEvent {
    /// Affected path (the new path for renames)
    pub path: PathBuf,
    /// What happened
    pub operation: FileOperation,
    /// Old path of a rename
    pub previous_path: Option<PathBuf>,
}

impl FileEvent {
    /// Event without a previous path
    pub fn new(path: impl Into<PathBuf>, operation: FileOperation) -> Self {
        Self {
            path: path.into(),
            operation,
            previous_path: None,
        }
    }

    /// A move from `from` to `to`
    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            path: to.into(),
            operation: FileOperation::Renamed,
            previous_path: Some(from.into()),
        }
    }
}

/// Receives file events
pub trait FileEventListener: Send + Sync {
    /// Handle one event; failures are logged, not returned
    fn on_file_event(&self, event: &FileEvent);
}

/// Turns `.java` changes into physical type notifications
pub struct PhysicalTypeMonitor {
    service: Arc<MetadataService>,
    layout: ProjectLayout,
}

impl PhysicalTypeMonitor {
    /// Monitor publishing through `service`
    #[must_use]
    pub fn new(service: Arc<MetadataService>, layout: ProjectLayout) -> Self {
        Self { service, layout }
    }

    /// Physical type identifier of a governor file
    #[must_use]
    pub fn physical_type_id(&self, file: &Path) -> Option<MetadataId> {
        let (path, java_type) = self.layout.resolve(file)?;
        match PhysicalTypeIdentifier::create(&java_type, &path) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Cannot identify {}: {}", file.display(), e);
                None
            }
        }
    }

    fn changed(&self, file: &Path) {
        if let Some(id) = self.physical_type_id(file) {
            debug!("Physical type changed: {}", id);
            self.service.publish_change(&id);
        }
    }

    fn removed(&self, file: &Path) {
        if let Some(id) = self.physical_type_id(file) {
            debug!("Physical type removed: {}", id);
            self.service.publish_change(&id);
            self.service.registry().deregister_dependencies(&id);
        }
    }
}

impl FileEventListener for PhysicalTypeMonitor {
    fn on_file_event(&self, event: &FileEvent) {
        match event.operation {
            FileOperation::Created | FileOperation::Updated => self.changed(&event.path),
            FileOperation::Deleted => self.removed(&event.path),
            FileOperation::Renamed => {
                if let Some(previous) = &event.previous_path {
                    self.removed(previous);
                }
                self.changed(&event.path);
            }
            FileOperation::MonitoringStart | FileOperation::MonitoringFinish => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::project::default_source_roots;
    use crate::registry::{DependencyRegistry, MetadataNotificationListener};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<MetadataId>>);

    impl MetadataNotificationListener for Recorder {
        fn notify(&self, upstream: &MetadataId, _downstream: &MetadataId) {
            self.0.lock().push(upstream.clone());
        }
    }

    fn monitor() -> (PhysicalTypeMonitor, Arc<MetadataService>) {
        let registry = Arc::new(DependencyRegistry::new());
        let service = MetadataService::new(registry, MetadataCache::default());
        let layout = ProjectLayout::new("/p", default_source_roots());
        (PhysicalTypeMonitor::new(Arc::clone(&service), layout), service)
    }

    fn downstream() -> MetadataId {
        MetadataId::parse("MID:test.Downstream").unwrap()
    }

    #[test]
    fn test_java_change_notifies_physical_type_downstreams() {
        let (monitor, service) = monitor();
        let recorder = Arc::new(Recorder::default());
        let registry = service.registry();
        registry.register_dependency(&PhysicalTypeIdentifier::class_id(), &downstream());
        registry.add_notification_listener(&recorder, Some(&downstream()));

        for path in [
            "/p/src/main/java/com/example/Bar.java",
            "/p/src/main/java/com/example/Bar_Roo_X.aj",
            "/p/README.java",
        ] {
            monitor.on_file_event(&FileEvent::new(path, FileOperation::Updated));
        }

        let seen = recorder.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].as_str(),
            "MID:org.springframework.roo.classpath.PhysicalTypeIdentifier#SRC_MAIN_JAVA?com.example.Bar"
        );
    }

    #[test]
    fn test_delete_drops_downstream_edges() {
        let (monitor, service) = monitor();
        let file = Path::new("/p/src/main/java/Bar.java");
        let pt = monitor.physical_type_id(file).unwrap();
        let itd = MetadataId::parse("MID:test.Itd#SRC_MAIN_JAVA?Bar").unwrap();
        service.registry().register_dependency(&pt, &itd);

        monitor.on_file_event(&FileEvent::new(file, FileOperation::Deleted));
        assert!(service.registry().get_downstream(&pt).is_empty());
    }

    #[test]
    fn test_rename_moves_identity() {
        let (monitor, service) = monitor();
        let old = Path::new("/p/src/main/java/Old.java");
        let pt = monitor.physical_type_id(old).unwrap();
        let itd = MetadataId::parse("MID:test.Itd#SRC_MAIN_JAVA?Old").unwrap();
        service.registry().register_dependency(&pt, &itd);

        monitor.on_file_event(&FileEvent::renamed(old, "/p/src/main/java/New.java"));
        assert!(service.registry().get_downstream(&pt).is_empty());
    }
}
