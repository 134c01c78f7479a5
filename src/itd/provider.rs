// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trigger-based ITD providers
//!
//! An add-on supplies an [`ItdMetadataFactory`] describing what it generates;
//! [`ItdTriggerBasedProvider`] does the rest. For each governor it decides
//! whether a trigger annotation is present, wires the governor's physical
//! type as upstream, asks the factory for content and keeps the `.aj` file
//! on disk in step with the answer.

use super::{ItdFileReconciler, ItdMetadata};
use crate::error::Result;
use crate::id::{naming, MetadataId, PhysicalTypeIdentifier};
use crate::physical::PhysicalTypeMetadata;
use crate::registry::DependencyRegistry;
use crate::service::{MetadataItem, MetadataProvider, MetadataService};
use crate::types::{JavaType, LogicalPath};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// What an ITD-generating add-on contributes
pub trait ItdMetadataFactory: Send + Sync {
    /// Class identifier of the metadata produced
    fn provides_type(&self) -> MetadataId;

    /// Suffix of generated files, `JavaBean` in `Foo_Roo_JavaBean.aj`
    fn itd_uniqueness_suffix(&self) -> &str;

    /// Annotations that switch generation on
    fn triggers(&self) -> Vec<JavaType>;

    /// Build the metadata for one triggered governor.
    ///
    /// Returning `None`, an invalid item, or an item without members removes
    /// any existing ITD file.
    fn get_metadata(
        &self,
        service: &MetadataService,
        id: &MetadataId,
        aspect_name: &JavaType,
        governor: &PhysicalTypeMetadata,
        itd_path: &Path,
    ) -> anyhow::Result<Option<ItdMetadata>>;

    /// Whether interfaces, enums and annotation types are ignored
    fn depends_on_governor_being_a_class(&self) -> bool {
        true
    }

    /// Generate for every governor regardless of annotations
    fn ignore_trigger_annotations(&self) -> bool {
        false
    }
}

/// Metadata provider driving one [`ItdMetadataFactory`]
pub struct ItdTriggerBasedProvider<F> {
    factory: F,
    triggers: RwLock<Vec<JavaType>>,
    reconciler: Arc<ItdFileReconciler>,
}

impl<F: ItdMetadataFactory> ItdTriggerBasedProvider<F> {
    /// Provider writing ITDs through `reconciler`
    pub fn new(factory: F, reconciler: Arc<ItdFileReconciler>) -> Self {
        let triggers = factory.triggers();
        Self {
            factory,
            triggers: RwLock::new(triggers),
            reconciler,
        }
    }

    /// The wrapped factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Also generate for governors carrying `annotation`
    pub fn add_metadata_trigger(&self, annotation: JavaType) {
        let mut triggers = self.triggers.write();
        if !triggers.contains(&annotation) {
            triggers.push(annotation);
        }
    }

    /// Stop treating `annotation` as a trigger
    pub fn remove_metadata_trigger(&self, annotation: &JavaType) {
        self.triggers.write().retain(|t| t != annotation);
    }

    /// Current trigger annotations
    pub fn metadata_triggers(&self) -> Vec<JavaType> {
        self.triggers.read().clone()
    }

    /// Listen to every physical type through a class-level dependency
    pub fn activate(&self, registry: &DependencyRegistry) {
        let provides = self.factory.provides_type().class_id();
        registry.register_dependency(&PhysicalTypeIdentifier::class_id(), &provides);
    }

    /// Undo [`activate`](Self::activate) and drop every governor edge into
    /// this provider's instances
    pub fn deactivate(&self, registry: &DependencyRegistry) {
        let provides = self.factory.provides_type().class_id();
        registry.deregister_dependency(&PhysicalTypeIdentifier::class_id(), &provides);
        for (upstream, downstream) in registry.dependencies() {
            if downstream.is_instance() && downstream.metadata_class() == provides.metadata_class() {
                registry.deregister_dependency(&upstream, &downstream);
            }
        }
    }

    /// This provider's identifier for a type in a logical path
    pub fn create_local_identifier(
        &self,
        java_type: &JavaType,
        path: &LogicalPath,
    ) -> Result<MetadataId> {
        naming::create_identifier(self.factory.provides_type().metadata_class(), java_type, path)
    }

    fn is_triggered(&self, governor: &PhysicalTypeMetadata) -> bool {
        if self.factory.ignore_trigger_annotations() {
            return true;
        }
        let Some(details) = governor.details() else {
            return false;
        };
        self.triggers
            .read()
            .iter()
            .any(|trigger| details.annotation(trigger).is_some())
    }

    fn remove_itd(&self, itd_path: &Path) -> anyhow::Result<()> {
        self.reconciler.reconcile(itd_path, None)?;
        Ok(())
    }
}

impl<F: ItdMetadataFactory> MetadataProvider for ItdTriggerBasedProvider<F> {
    fn provides_type(&self) -> MetadataId {
        self.factory.provides_type()
    }

    fn get(
        &self,
        service: &MetadataService,
        id: &MetadataId,
    ) -> anyhow::Result<Option<Arc<dyn MetadataItem>>> {
        let provides = self.factory.provides_type();
        let (path, java_type) = naming::parse(provides.metadata_class(), id)?;
        let governor_id = PhysicalTypeIdentifier::create(&java_type, &path)?;

        let Some(governor) = service.get_as::<PhysicalTypeMetadata>(&governor_id)? else {
            debug!("Governor {} not available for {}", governor_id, id);
            return Ok(None);
        };
        if governor.details().is_none() {
            debug!("No type details for {}", governor_id);
            return Ok(None);
        }

        let suffix = self.factory.itd_uniqueness_suffix();
        let itd_path = governor.itd_canonical_path(suffix);
        let registry = service.registry();
        registry.register_dependency(&governor_id, id);

        let eligible = self.is_triggered(&governor)
            && (!self.factory.depends_on_governor_being_a_class() || governor.is_class());
        if !eligible {
            self.remove_itd(&itd_path)?;
            registry.deregister_dependency(&governor_id, id);
            return Ok(None);
        }

        let aspect = governor.itd_java_type(suffix);
        match self
            .factory
            .get_metadata(service, id, &aspect, &governor, &itd_path)?
        {
            Some(metadata) if metadata.is_valid() => {
                self.reconciler
                    .reconcile(&itd_path, metadata.rendered().as_deref())?;
                Ok(Some(Arc::new(metadata)))
            }
            _ => {
                self.remove_itd(&itd_path)?;
                Ok(None)
            }
        }
    }

    fn local_identifier(&self, upstream: &MetadataId) -> Option<MetadataId> {
        if !PhysicalTypeIdentifier::is_valid(upstream) {
            return None;
        }
        let (path, java_type) = PhysicalTypeIdentifier::parse(upstream).ok()?;
        self.create_local_identifier(&java_type, &path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::itd::{DiskFileManager, ItdMethod, ItdTypeDetails};
    use crate::physical::PhysicalTypeMetadataProvider;
    use crate::project::{default_source_roots, ProjectLayout, SRC_MAIN_JAVA};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Adds `int answer()` to every triggered governor
    struct Answer;

    impl ItdMetadataFactory for Answer {
        fn provides_type(&self) -> MetadataId {
            MetadataId::for_class("test.AnswerMetadata").unwrap()
        }

        fn itd_uniqueness_suffix(&self) -> &str {
            "Answer"
        }

        fn triggers(&self) -> Vec<JavaType> {
            vec![JavaType::new("test.RooAnswer")]
        }

        fn get_metadata(
            &self,
            _service: &MetadataService,
            id: &MetadataId,
            aspect_name: &JavaType,
            governor: &PhysicalTypeMetadata,
            itd_path: &Path,
        ) -> anyhow::Result<Option<ItdMetadata>> {
            let declared = governor
                .details()
                .is_some_and(|d| d.declares_method("answer", 0));
            if declared {
                return Ok(Some(ItdMetadata::invalid(
                    id.clone(),
                    governor.id().clone(),
                    itd_path.to_path_buf(),
                )));
            }
            let mut details = ItdTypeDetails::new(aspect_name.clone(), governor.java_type().clone());
            details
                .methods
                .push(ItdMethod::public("int", "answer", vec![], vec!["return 42;".into()]));
            Ok(Some(ItdMetadata::new(
                id.clone(),
                governor.id().clone(),
                itd_path.to_path_buf(),
                Some(details),
            )))
        }
    }

    struct Fixture {
        dir: TempDir,
        service: Arc<MetadataService>,
        provider: Arc<ItdTriggerBasedProvider<Answer>>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let layout = ProjectLayout::new(dir.path(), default_source_roots());
            let registry = Arc::new(DependencyRegistry::new());
            let service = MetadataService::new(registry, MetadataCache::default());
            service.register_provider(Arc::new(PhysicalTypeMetadataProvider::new(
                layout,
                Arc::new(DiskFileManager),
            )));
            let reconciler = Arc::new(ItdFileReconciler::new(Arc::new(DiskFileManager)));
            let provider = Arc::new(ItdTriggerBasedProvider::new(Answer, reconciler));
            provider.activate(service.registry());
            service.register_provider(provider.clone());
            Self { dir, service, provider }
        }

        fn governor(&self, source: &str) -> PathBuf {
            let file = self.dir.path().join("src/main/java/com/example/Bar.java");
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(&file, source).unwrap();
            file
        }

        fn itd(&self) -> PathBuf {
            self.dir.path().join("src/main/java/com/example/Bar_Roo_Answer.aj")
        }

        fn ids(&self) -> (MetadataId, MetadataId) {
            let java_type = JavaType::new("com.example.Bar");
            let path = LogicalPath::new(SRC_MAIN_JAVA);
            (
                PhysicalTypeIdentifier::create(&java_type, &path).unwrap(),
                self.provider.create_local_identifier(&java_type, &path).unwrap(),
            )
        }
    }

    const TRIGGERED: &str = "package com.example;\nimport test.RooAnswer;\n@RooAnswer\npublic class Bar {}\n";

    #[test]
    fn test_triggered_governor_gets_itd() {
        let f = Fixture::new();
        f.governor(TRIGGERED);
        let (pt, id) = f.ids();

        let item = f.service.get(&id).unwrap().unwrap();
        assert!(item.itd_type_details().is_some());
        let written = fs::read_to_string(f.itd()).unwrap();
        assert!(written.contains("privileged aspect Bar_Roo_Answer {"));
        assert!(written.contains("public int Bar.answer() {"));
        assert!(f.service.registry().get_downstream(&pt).contains(&id));
    }

    #[test]
    fn test_untriggered_governor_has_no_itd() {
        let f = Fixture::new();
        f.governor("package com.example;\npublic class Bar {}\n");
        let (pt, id) = f.ids();

        assert!(f.service.get(&id).unwrap().is_none());
        assert!(!f.itd().exists());
        assert!(!f.service.registry().get_downstream(&pt).contains(&id));
    }

    #[test]
    fn test_missing_governor_is_absent() {
        let f = Fixture::new();
        let (_, id) = f.ids();
        assert!(f.service.get(&id).unwrap().is_none());
    }

    #[test]
    fn test_interface_governor_ignored() {
        let f = Fixture::new();
        f.governor("package com.example;\nimport test.RooAnswer;\n@RooAnswer\npublic interface Bar {}\n");
        let (_, id) = f.ids();
        assert!(f.service.get(&id).unwrap().is_none());
        assert!(!f.itd().exists());
    }

    #[test]
    fn test_removing_trigger_deletes_itd() {
        let f = Fixture::new();
        f.governor(TRIGGERED);
        let (pt, id) = f.ids();
        f.service.get(&id).unwrap();
        assert!(f.itd().exists());

        f.governor("package com.example;\npublic class Bar {}\n");
        f.service.publish_change(&pt);

        assert!(!f.itd().exists());
        assert!(!f.service.registry().get_downstream(&pt).contains(&id));
    }

    #[test]
    fn test_invalid_metadata_deletes_itd() {
        let f = Fixture::new();
        f.governor(TRIGGERED);
        let (pt, id) = f.ids();
        f.service.get(&id).unwrap();
        assert!(f.itd().exists());

        f.governor(
            "package com.example;\nimport test.RooAnswer;\n@RooAnswer\npublic class Bar {\n    public int answer() { return 7; }\n}\n",
        );
        f.service.publish_change(&pt);

        assert!(!f.itd().exists());
        assert!(f.service.get(&id).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_requests_write_once() {
        let f = Fixture::new();
        f.governor(TRIGGERED);
        let (pt, id) = f.ids();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        f.service.get(&id).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..10 {
                    f.service.publish_change(&pt);
                }
            });
        });

        let stats = f.provider.reconciler.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 0);
        assert_eq!(f.service.pending_requests(), 0);
        assert!(f.service.get(&id).unwrap().is_some());
        assert!(fs::read_to_string(f.itd()).unwrap().contains("public int Bar.answer() {"));
    }

    #[test]
    fn test_class_notification_reaches_new_governor() {
        let f = Fixture::new();
        f.governor(TRIGGERED);
        let (pt, _) = f.ids();

        // nothing requested yet; the class-level edge routes the change
        f.service.publish_change(&pt);
        assert!(f.itd().exists());
    }

    #[test]
    fn test_local_identifier() {
        let f = Fixture::new();
        let (pt, id) = f.ids();
        assert_eq!(f.provider.local_identifier(&pt), Some(id.clone()));
        assert_eq!(f.provider.local_identifier(&id), None);
    }

    #[test]
    fn test_trigger_management() {
        let f = Fixture::new();
        f.provider.add_metadata_trigger(JavaType::new("test.Other"));
        f.provider.add_metadata_trigger(JavaType::new("test.Other"));
        assert_eq!(f.provider.metadata_triggers().len(), 2);

        f.provider.remove_metadata_trigger(&JavaType::new("test.RooAnswer"));
        f.governor(TRIGGERED);
        let (_, id) = f.ids();
        assert!(f.service.get(&id).unwrap().is_none());
    }

    #[test]
    fn test_deactivate_removes_edges() {
        let f = Fixture::new();
        let class = Answer.provides_type();
        let registry = f.service.registry();
        assert!(registry.get_downstream(&PhysicalTypeIdentifier::class_id()).contains(&class));
        f.governor(TRIGGERED);
        let (pt, id) = f.ids();
        f.service.get(&id).unwrap();
        assert!(registry.get_downstream(&pt).contains(&id));

        f.provider.deactivate(registry);
        assert!(registry.get_downstream(&PhysicalTypeIdentifier::class_id()).is_empty());
        assert!(registry.get_upstream(&id).is_empty());
    }
}
