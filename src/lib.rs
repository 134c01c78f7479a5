// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Metaweave library - metadata dependency engine for generated inter-type declarations
//!
//! This crate keeps AspectJ inter-type declaration files (`Foo_Roo_JavaBean.aj`)
//! in step with the annotated Java types that govern them. Computed facts are
//! addressed by metadata identifiers, wired together in an acyclic dependency
//! registry, cached, and recomputed when an upstream physical type changes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod addons;
pub mod cache;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod itd;
pub mod monitor;
pub mod physical;
pub mod project;
pub mod registry;
pub mod scanner;
pub mod service;

/// Core data types describing governors
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::fmt;

    // =========================================================================
    // Java Types
    // =========================================================================

    /// A fully qualified (or, when unresolved, simple) Java type name
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct JavaType(String);

    impl JavaType {
        /// Create a type from its dotted name
        pub fn new(name: impl Into<String>) -> Self {
            Self(name.into())
        }

        /// The name after the last dot
        #[must_use]
        pub fn simple_name(&self) -> &str {
            self.0.rsplit('.').next().unwrap_or(&self.0)
        }

        /// The package, empty for the default package or unresolved names
        #[must_use]
        pub fn package(&self) -> &str {
            self.0.rsplit_once('.').map_or("", |(pkg, _)| pkg)
        }

        /// Whether the name carries a package
        #[must_use]
        pub fn is_qualified(&self) -> bool {
            self.0.contains('.')
        }

        /// A type with the same package and a different simple name
        #[must_use]
        pub fn sibling(&self, simple_name: &str) -> Self {
            if self.package().is_empty() {
                Self(simple_name.to_string())
            } else {
                Self(format!("{}.{}", self.package(), simple_name))
            }
        }

        /// Whether two names denote the same type.
        ///
        /// Unresolved simple names match any type with the same simple name.
        #[must_use]
        pub fn matches(&self, other: &JavaType) -> bool {
            if self.is_qualified() && other.is_qualified() {
                self.0 == other.0
            } else {
                self.simple_name() == other.simple_name()
            }
        }
    }

    impl fmt::Display for JavaType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    // =========================================================================
    // Logical Paths
    // =========================================================================

    /// A source root within an optional module, e.g. `SRC_MAIN_JAVA` or `core|SRC_MAIN_JAVA`
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct LogicalPath {
        /// Module name, `None` for the root module
        pub module: Option<String>,
        /// Source root name, upper case
        pub root: String,
    }

    impl LogicalPath {
        /// Separator between module and root
        pub const MODULE_SEPARATOR: char = '|';

        /// Logical path in the root module
        pub fn new(root: impl Into<String>) -> Self {
            Self {
                module: None,
                root: root.into().to_uppercase(),
            }
        }

        /// Parse `ROOT` or `module|ROOT`
        #[must_use]
        pub fn parse(text: &str) -> Self {
            match text.split_once(Self::MODULE_SEPARATOR) {
                Some((module, root)) if !module.is_empty() => Self {
                    module: Some(module.to_string()),
                    root: root.to_uppercase(),
                },
                Some((_, root)) => Self::new(root),
                None => Self::new(text),
            }
        }
    }

    impl fmt::Display for LogicalPath {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match &self.module {
                Some(module) => write!(f, "{module}{}{}", Self::MODULE_SEPARATOR, self.root),
                None => f.write_str(&self.root),
            }
        }
    }

    // =========================================================================
    // Type Details
    // =========================================================================

    /// Kind of a top-level type declaration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum PhysicalTypeCategory {
        /// `class`
        Class,
        /// `interface`
        Interface,
        /// `enum`
        Enumeration,
        /// `@interface`
        Annotation,
    }

    /// An annotation on a type, with raw attribute values
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AnnotationMetadata {
        /// Annotation type, resolved through imports where possible
        pub annotation_type: JavaType,
        /// Attribute name to source text; a single unnamed value is stored as `value`
        #[serde(default)]
        pub attributes: BTreeMap<String, String>,
    }

    impl AnnotationMetadata {
        /// Raw source text of an attribute
        #[must_use]
        pub fn attribute(&self, name: &str) -> Option<&str> {
            self.attributes.get(name).map(String::as_str)
        }

        /// Boolean attribute, falling back to a default
        #[must_use]
        pub fn bool_attribute(&self, name: &str, default: bool) -> bool {
            match self.attribute(name).map(str::trim) {
                Some("true") => true,
                Some("false") => false,
                _ => default,
            }
        }

        /// String or string array attribute, e.g. `{"a", "b"}` or `"a"`
        #[must_use]
        pub fn string_array_attribute(&self, name: &str) -> Vec<String> {
            let Some(raw) = self.attribute(name) else {
                return Vec::new();
            };
            raw.trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .split(',')
                .map(|item| item.trim().trim_matches('"').to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }
    }

    /// A field declared in the governor
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FieldMetadata {
        /// Modifiers such as `private`, `static`, `final`
        #[serde(default)]
        pub modifiers: Vec<String>,
        /// Type as written in source
        pub field_type: String,
        /// Field name
        pub name: String,
    }

    impl FieldMetadata {
        /// Whether the field is `static`
        #[must_use]
        pub fn is_static(&self) -> bool {
            self.modifiers.iter().any(|m| m == "static")
        }

        /// Whether the field is `final`
        #[must_use]
        pub fn is_final(&self) -> bool {
            self.modifiers.iter().any(|m| m == "final")
        }
    }

    /// Signature of a method declared in the governor
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MethodMetadata {
        /// Method name
        pub name: String,
        /// Parameter types as written in source
        #[serde(default)]
        pub parameter_types: Vec<String>,
    }

    /// What the scanner learned about a governor
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ClassOrInterfaceTypeDetails {
        /// The declared type
        pub name: JavaType,
        /// Class, interface, enum or annotation
        pub category: PhysicalTypeCategory,
        /// Type-level annotations
        #[serde(default)]
        pub annotations: Vec<AnnotationMetadata>,
        /// Declared fields
        #[serde(default)]
        pub fields: Vec<FieldMetadata>,
        /// Declared methods (constructors excluded)
        #[serde(default)]
        pub methods: Vec<MethodMetadata>,
        /// Import declarations
        #[serde(default)]
        pub imports: Vec<String>,
    }

    impl ClassOrInterfaceTypeDetails {
        /// The annotation of the given type, if present
        #[must_use]
        pub fn annotation(&self, annotation_type: &JavaType) -> Option<&AnnotationMetadata> {
            self.annotations
                .iter()
                .find(|a| a.annotation_type.matches(annotation_type))
        }

        /// Whether a method with this name and parameter count is declared
        #[must_use]
        pub fn declares_method(&self, name: &str, parameter_count: usize) -> bool {
            self.methods
                .iter()
                .any(|m| m.name == name && m.parameter_types.len() == parameter_count)
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{MetadataId, PhysicalTypeIdentifier};
    pub use crate::service::{MetadataItem, MetadataProvider, MetadataService};
    pub use crate::types::*;
}
