// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! `toString()` for `@RooToString` types

use crate::id::MetadataId;
use crate::itd::{ItdMetadata, ItdMetadataFactory, ItdMethod, ItdTypeDetails};
use crate::physical::PhysicalTypeMetadata;
use crate::service::{MetadataItem, MetadataService};
use crate::types::JavaType;
use std::path::Path;

/// Metadata class of ToString ITDs
pub const PROVIDES_TYPE: &str = "org.springframework.roo.addon.tostring.ToStringMetadata";

/// Trigger annotation
pub const ROO_TO_STRING: &str = "org.springframework.roo.addon.tostring.annotations.RooToString";

/// Generates `toString()` over the governor's instance fields
#[derive(Debug, Default, Clone, Copy)]
pub struct ToStringMetadataFactory;

impl ItdMetadataFactory for ToStringMetadataFactory {
    fn provides_type(&self) -> MetadataId {
        MetadataId::of_class(PROVIDES_TYPE)
    }

    fn itd_uniqueness_suffix(&self) -> &str {
        "ToString"
    }

    fn triggers(&self) -> Vec<JavaType> {
        vec![JavaType::new(ROO_TO_STRING)]
    }

    fn get_metadata(
        &self,
        _service: &MetadataService,
        id: &MetadataId,
        aspect_name: &JavaType,
        governor: &PhysicalTypeMetadata,
        itd_path: &Path,
    ) -> anyhow::Result<Option<ItdMetadata>> {
        let Some(type_details) = governor.details() else {
            return Ok(None);
        };
        let mut details = ItdTypeDetails::new(aspect_name.clone(), governor.java_type().clone());

        // a hand-written toString wins
        if !type_details.declares_method("toString", 0) {
            let excluded = type_details
                .annotation(&JavaType::new(ROO_TO_STRING))
                .map(|a| a.string_array_attribute("excludeFields"))
                .unwrap_or_default();
            let fields: Vec<&str> = type_details
                .fields
                .iter()
                .filter(|f| !f.is_static() && !excluded.contains(&f.name))
                .map(|f| f.name.as_str())
                .collect();

            let mut body = vec!["StringBuilder sb = new StringBuilder();".to_string()];
            for (i, name) in fields.iter().enumerate() {
                let separator = if i + 1 < fields.len() { ".append(\", \")" } else { "" };
                body.push(format!(
                    "sb.append(\"{label}: \").append(this.{name}){separator};",
                    label = super::capitalize(name)
                ));
            }
            body.push("return sb.toString();".to_string());

            details
                .methods
                .push(ItdMethod::public("String", "toString", Vec::new(), body));
        }

        Ok(Some(ItdMetadata::new(
            id.clone(),
            governor.id().clone(),
            itd_path.to_path_buf(),
            Some(details),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::id::{naming, PhysicalTypeIdentifier};
    use crate::registry::DependencyRegistry;
    use crate::types::LogicalPath;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn generate(source: &str) -> ItdTypeDetails {
        let java_type = JavaType::new("Point");
        let path = LogicalPath::new("SRC_MAIN_JAVA");
        let governor = PhysicalTypeMetadata::new(
            PhysicalTypeIdentifier::create(&java_type, &path).unwrap(),
            path.clone(),
            java_type.clone(),
            PathBuf::from("Point.java"),
            source,
        );
        let registry = Arc::new(DependencyRegistry::new());
        let service = MetadataService::new(registry, MetadataCache::default());
        let id = naming::create_identifier(PROVIDES_TYPE, &java_type, &path).unwrap();

        let aspect = governor.itd_java_type("ToString");
        ToStringMetadataFactory
            .get_metadata(&service, &id, &aspect, &governor, Path::new("x.aj"))
            .unwrap()
            .unwrap()
            .itd_type_details()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_to_string_lists_fields() {
        let details = generate("@RooToString class Point { int x; int y; static int ORIGIN; }");
        assert_eq!(details.methods.len(), 1);
        assert_eq!(
            details.methods[0].body,
            vec![
                "StringBuilder sb = new StringBuilder();".to_string(),
                "sb.append(\"X: \").append(this.x).append(\", \");".to_string(),
                "sb.append(\"Y: \").append(this.y);".to_string(),
                "return sb.toString();".to_string(),
            ]
        );
    }

    #[test]
    fn test_excluded_fields() {
        let details = generate(
            "@RooToString(excludeFields = {\"y\"}) class Point { int x; int y; }",
        );
        let body = &details.methods[0].body;
        assert_eq!(body.len(), 3);
        assert!(body[1].contains("this.x"));
    }

    #[test]
    fn test_declared_to_string_suppresses_itd() {
        let details = generate(
            "@RooToString class Point { int x; public String toString() { return \"p\"; } }",
        );
        assert!(details.is_empty());
    }
}
