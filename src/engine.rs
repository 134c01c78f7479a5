// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Engine wiring
//!
//! Builds the registry, cache, service, reconciler, providers and file
//! listeners for one project and routes file events through them.

use crate::addons::AddOns;
use crate::cache::{CacheStats, MetadataCache};
use crate::config::Config;
use crate::itd::reconcile::ReconcileStats;
use crate::itd::{
    is_itd_file, DiskFileManager, FileManager, ItdFileDeletionService, ItdFileReconciler,
    JAVA_EXTENSION,
};
use crate::monitor::{FileEvent, FileEventListener, FileOperation, PhysicalTypeMonitor};
use crate::physical::PhysicalTypeMetadataProvider;
use crate::project::ProjectLayout;
use crate::registry::{DependencyRegistry, RegistryStats};
use crate::service::{MetadataService, ProviderTiming};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Counters reported by `status`
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Metadata cache counters
    pub cache: CacheStats,
    /// Dependency graph size
    pub registry: RegistryStats,
    /// File writes and deletions
    pub files: ReconcileStats,
    /// Time spent per provider
    pub providers: Vec<ProviderTiming>,
}

/// What a full scan found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Governor candidates visited
    pub java_files: usize,
    /// Existing ITD files visited
    pub itd_files: usize,
}

/// A wired metadata engine for one project
pub struct Engine {
    config: Config,
    layout: ProjectLayout,
    service: Arc<MetadataService>,
    reconciler: Arc<ItdFileReconciler>,
    addons: AddOns,
    monitor: PhysicalTypeMonitor,
    deletion: ItdFileDeletionService,
}

impl Engine {
    /// Engine working on the real file system
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_file_manager(config, Arc::new(DiskFileManager))
    }

    /// Engine reading and writing through `files`
    #[must_use]
    pub fn with_file_manager(config: Config, files: Arc<dyn FileManager>) -> Self {
        let layout = config.layout();
        let registry = Arc::new(DependencyRegistry::new());
        let service = MetadataService::new(
            Arc::clone(&registry),
            MetadataCache::with_capacity(config.cache_capacity),
        );
        let reconciler = Arc::new(ItdFileReconciler::new(Arc::clone(&files)));

        service.register_provider(Arc::new(PhysicalTypeMetadataProvider::new(
            layout.clone(),
            files,
        )));
        let addons = AddOns::install(&service, &reconciler);
        let monitor = PhysicalTypeMonitor::new(Arc::clone(&service), layout.clone());
        let deletion = ItdFileDeletionService::new(Arc::clone(&reconciler));

        debug!("Engine ready for {}", layout.root().display());
        Self {
            config,
            layout,
            service,
            reconciler,
            addons,
            monitor,
            deletion,
        }
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source layout
    #[must_use]
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// The metadata service
    #[must_use]
    pub fn service(&self) -> &Arc<MetadataService> {
        &self.service
    }

    /// The dependency registry
    #[must_use]
    pub fn registry(&self) -> &Arc<DependencyRegistry> {
        self.service.registry()
    }

    /// The ITD file reconciler
    #[must_use]
    pub fn reconciler(&self) -> &Arc<ItdFileReconciler> {
        &self.reconciler
    }

    /// The bundled add-on providers
    #[must_use]
    pub fn addons(&self) -> &AddOns {
        &self.addons
    }

    /// Route one file event: orphan cleanup first, then physical type changes
    pub fn handle_event(&self, event: &FileEvent) {
        debug!("{:?} {}", event.operation, event.path.display());
        self.deletion.on_file_event(event);
        self.monitor.on_file_event(event);
    }

    /// Walk every source root, reporting existing files as created
    pub fn scan(&self) -> ScanSummary {
        let mut java = Vec::new();
        let mut itds = Vec::new();
        for (path, dir) in self.layout.source_directories() {
            if !dir.is_dir() {
                debug!("Source root {} ({}) absent", path, dir.display());
                continue;
            }
            for entry in WalkDir::new(&dir)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let file = entry.into_path();
                if is_itd_file(&file) {
                    itds.push(file);
                } else if file.extension().and_then(|e| e.to_str()) == Some(JAVA_EXTENSION) {
                    java.push(file);
                }
            }
        }

        let root = self.layout.root().to_path_buf();
        self.handle_event(&FileEvent::new(&root, FileOperation::MonitoringStart));
        for file in &java {
            self.handle_event(&FileEvent::new(file, FileOperation::Created));
        }
        // after governors, so only true orphans remain to delete
        for file in &itds {
            self.handle_event(&FileEvent::new(file, FileOperation::Created));
        }
        self.handle_event(&FileEvent::new(root, FileOperation::MonitoringFinish));

        let summary = ScanSummary {
            java_files: java.len(),
            itd_files: itds.len(),
        };
        info!(
            "Scanned {} governor candidates and {} ITD files",
            summary.java_files, summary.itd_files
        );
        summary
    }

    /// Counters for status reporting
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            cache: self.service.cache_stats(),
            registry: self.registry().stats(),
            files: self.reconciler.stats(),
            providers: self.service.timings(),
        }
    }

    /// Directories a watcher should observe
    #[must_use]
    pub fn watch_directories(&self) -> Vec<PathBuf> {
        self.layout
            .source_directories()
            .into_iter()
            .map(|(_, dir)| dir)
            .filter(|dir| dir.is_dir())
            .collect()
    }

    /// Deactivate providers and drop cached metadata
    pub fn shutdown(&self) {
        self.addons.uninstall(&self.service);
        self.service.evict_all();
        info!("Engine stopped");
    }
}
