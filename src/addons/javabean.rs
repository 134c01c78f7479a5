// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Accessors for `@RooJavaBean` types

use super::capitalize;
use crate::id::MetadataId;
use crate::itd::{ItdMetadata, ItdMetadataFactory, ItdMethod, ItdTypeDetails};
use crate::physical::PhysicalTypeMetadata;
use crate::service::{MetadataItem, MetadataService};
use crate::types::{FieldMetadata, JavaType};
use std::path::Path;

/// Metadata class of JavaBean ITDs
pub const PROVIDES_TYPE: &str = "org.springframework.roo.addon.javabean.JavaBeanMetadata";

/// Trigger annotation
pub const ROO_JAVA_BEAN: &str = "org.springframework.roo.addon.javabean.annotations.RooJavaBean";

/// Generates a getter for every instance field and a setter for every mutable one
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaBeanMetadataFactory;

fn getter_name(field: &FieldMetadata) -> String {
    let prefix = if field.field_type == "boolean" { "is" } else { "get" };
    format!("{prefix}{}", capitalize(&field.name))
}

fn setter_name(field: &FieldMetadata) -> String {
    format!("set{}", capitalize(&field.name))
}

impl ItdMetadataFactory for JavaBeanMetadataFactory {
    fn provides_type(&self) -> MetadataId {
        MetadataId::of_class(PROVIDES_TYPE)
    }

    fn itd_uniqueness_suffix(&self) -> &str {
        "JavaBean"
    }

    fn triggers(&self) -> Vec<JavaType> {
        vec![JavaType::new(ROO_JAVA_BEAN)]
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
        let setters_by_default = type_details
            .annotation(&JavaType::new(ROO_JAVA_BEAN))
            .map_or(true, |a| a.bool_attribute("settersByDefault", true));

        let mut details = ItdTypeDetails::new(aspect_name.clone(), governor.java_type().clone());
        for field in type_details.fields.iter().filter(|f| !f.is_static()) {
            let getter = getter_name(field);
            if !type_details.declares_method(&getter, 0) {
                details.methods.push(ItdMethod::public(
                    field.field_type.clone(),
                    getter,
                    Vec::new(),
                    vec![format!("return this.{};", field.name)],
                ));
            }

            let setter = setter_name(field);
            if setters_by_default && !field.is_final() && !type_details.declares_method(&setter, 1) {
                details.methods.push(ItdMethod::public(
                    "void",
                    setter,
                    vec![(field.field_type.clone(), field.name.clone())],
                    vec![format!("this.{0} = {0};", field.name)],
                ));
            }
        }

        Ok(Some(ItdMetadata::new(
            id.clone(),
            governor.id().clone(),
            itd_path.to_path_buf(),
            Some(details),
        )))
    }
}
