// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Reference add-ons generating ITDs

pub mod javabean;
pub mod to_string;

use crate::id::MetadataId;
use crate::itd::{ItdFileReconciler, ItdMetadataFactory, ItdTriggerBasedProvider};
use crate::service::MetadataService;
use std::sync::Arc;
use tracing::debug;

pub use javabean::JavaBeanMetadataFactory;
pub use to_string::ToStringMetadataFactory;

/// The bundled providers, registered and activated together
pub struct AddOns {
    /// Accessors (`@RooJavaBean`)
    pub javabean: Arc<ItdTriggerBasedProvider<JavaBeanMetadataFactory>>,
    /// `toString()` (`@RooToString`)
    pub to_string: Arc<ItdTriggerBasedProvider<ToStringMetadataFactory>>,
}

impl AddOns {
    /// Register every bundled provider with the service and activate it
    #[must_use]
    pub fn install(service: &MetadataService, reconciler: &Arc<ItdFileReconciler>) -> Self {
        let javabean = Arc::new(ItdTriggerBasedProvider::new(
            JavaBeanMetadataFactory,
            Arc::clone(reconciler),
        ));
        let to_string = Arc::new(ItdTriggerBasedProvider::new(
            ToStringMetadataFactory,
            Arc::clone(reconciler),
        ));

        javabean.activate(service.registry());
        to_string.activate(service.registry());
        service.register_provider(javabean.clone());
        service.register_provider(to_string.clone());
        debug!("Installed JavaBean and ToString add-ons");

        Self { javabean, to_string }
    }

    /// Deactivate and deregister every bundled provider
    pub fn uninstall(&self, service: &MetadataService) {
        self.javabean.deactivate(service.registry());
        self.to_string.deactivate(service.registry());
        for provides in self.provided_types() {
            service.deregister_provider(&provides);
        }
    }

    /// Metadata classes produced by the bundled providers
    #[must_use]
    pub fn provided_types(&self) -> Vec<MetadataId> {
        vec![
            self.javabean.factory().provides_type(),
            self.to_string.factory().provides_type(),
        ]
    }
}

/// `name` with its first character upper-cased
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("name"), "Name");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
    }
}
