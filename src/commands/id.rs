// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Id command - takes a metadata identifier apart

use super::GlobalOptions;
use crate::id::{self, naming, MetadataId};
use anyhow::{Context, Result};
use serde::Serialize;

/// Parts of one identifier
#[derive(Debug, Serialize)]
pub struct IdReport {
    /// The identifier as given
    pub id: String,
    /// Whether it names a provider class
    pub class: bool,
    /// Provider class portion
    pub metadata_class: String,
    /// Class-level identifier
    pub class_id: String,
    /// Instance key, for instance identifiers
    pub instance: Option<String>,
    /// Logical path, for `<path>?<type>` keys
    pub logical_path: Option<String>,
    /// Java type, for `<path>?<type>` keys
    pub java_type: Option<String>,
}

impl IdReport {
    /// Describe an identifier
    pub fn describe(text: &str) -> Result<Self> {
        let parsed = MetadataId::parse(text)
            .with_context(|| format!("'{text}' is not a metadata identifier"))?;
        let scoped = naming::parse(parsed.metadata_class(), &parsed).ok();
        Ok(Self {
            id: text.to_string(),
            class: id::is_identifying_class(text),
            metadata_class: parsed.metadata_class().to_string(),
            class_id: parsed.class_id().to_string(),
            instance: id::get_metadata_instance(text).map(str::to_string),
            logical_path: scoped.as_ref().map(|(path, _)| path.to_string()),
            java_type: scoped.map(|(_, java_type)| java_type.to_string()),
        })
    }
}

/// Run the id command
pub fn run(options: &GlobalOptions, text: &str) -> Result<()> {
    let report = IdReport::describe(text)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("id:       {}", report.id);
    println!("kind:     {}", if report.class { "class" } else { "instance" });
    println!("class:    {}", report.metadata_class);
    println!("class id: {}", report.class_id);
    if let Some(instance) = &report.instance {
        println!("instance: {instance}");
    }
    if let (Some(path), Some(java_type)) = (&report.logical_path, &report.java_type) {
        println!("path:     {path}");
        println!("type:     {java_type}");
    }
    Ok(())
}
