// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Metadata identification strings
//!
//! Every metadata item is addressed by a string of the form
//! `MID:<provider-class>[#<instance>]`. Identifiers without `#` name a
//! provider (class identifiers); identifiers with `#` name one computed fact
//! (instance identifiers). Only the first `#` is a delimiter, so instance
//! keys may themselves contain `#`.

use crate::error::{Error, Result};
use crate::types::{JavaType, LogicalPath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every metadata identification string
pub const MID_PREFIX: &str = "MID:";

/// Separator between the metadata class and the instance key
pub const INSTANCE_DELIMITER: char = '#';

// =========================================================================
// String functions
// =========================================================================

/// Create a class-level identifier for a provider class.
///
/// Returns `None` when the class is blank or contains the reserved `#`.
#[must_use]
pub fn create(provider_class: &str) -> Option<String> {
    if provider_class.trim().is_empty() || provider_class.contains(INSTANCE_DELIMITER) {
        return None;
    }
    Some(format!("{MID_PREFIX}{provider_class}"))
}

/// Create an instance-level identifier.
///
/// Returns `None` when either part is blank or the class contains `#`.
#[must_use]
pub fn create_instance(provider_class: &str, instance: &str) -> Option<String> {
    if instance.trim().is_empty() {
        return None;
    }
    create(provider_class).map(|class_id| format!("{class_id}{INSTANCE_DELIMITER}{instance}"))
}

/// Whether the string is a syntactically valid metadata identifier
#[must_use]
pub fn is_valid(id: &str) -> bool {
    id.len() > MID_PREFIX.len() && id.starts_with(MID_PREFIX)
}

/// Whether the identifier names a provider class (no `#`)
#[must_use]
pub fn is_identifying_class(id: &str) -> bool {
    is_valid(id) && !id.contains(INSTANCE_DELIMITER)
}

/// Whether the identifier names an instance (has a `#`, even a trailing one)
#[must_use]
pub fn is_identifying_instance(id: &str) -> bool {
    is_valid(id) && id.contains(INSTANCE_DELIMITER)
}

/// The provider class portion, between `MID:` and the first `#`
#[must_use]
pub fn get_metadata_class(id: &str) -> Option<&str> {
    if !is_valid(id) {
        return None;
    }
    let body = &id[MID_PREFIX.len()..];
    Some(match body.find(INSTANCE_DELIMITER) {
        Some(idx) => &body[..idx],
        None => body,
    })
}

/// The instance portion, everything after the first `#`
#[must_use]
pub fn get_metadata_instance(id: &str) -> Option<&str> {
    if !is_identifying_instance(id) {
        return None;
    }
    id.find(INSTANCE_DELIMITER).map(|idx| &id[idx + 1..])
}

/// The class-level identifier of any valid identifier
#[must_use]
pub fn get_metadata_class_id(id: &str) -> Option<String> {
    get_metadata_class(id).map(|class| format!("{MID_PREFIX}{class}"))
}

// =========================================================================
// Validated identifier
// =========================================================================

/// A validated metadata identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetadataId(String);

impl MetadataId {
    /// Parse and validate an identifier string
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(Error::MalformedIdentifier(id))
        }
    }

    /// Class identifier for a provider class
    pub fn for_class(provider_class: &str) -> Result<Self> {
        create(provider_class)
            .map(Self)
            .ok_or_else(|| Error::MalformedIdentifier(provider_class.to_string()))
    }

    /// Class identifier for a provider class name constant.
    ///
    /// `#` is not part of any class name and is dropped.
    #[must_use]
    pub fn of_class(provider_class: &str) -> Self {
        Self(format!("{MID_PREFIX}{}", provider_class.replace(INSTANCE_DELIMITER, "")))
    }

    /// Instance identifier for a provider class and instance key
    pub fn for_instance(provider_class: &str, instance: &str) -> Result<Self> {
        create_instance(provider_class, instance)
            .map(Self)
            .ok_or_else(|| {
                Error::MalformedIdentifier(format!("{provider_class}{INSTANCE_DELIMITER}{instance}"))
            })
    }

    /// The full identification string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names a provider class
    #[must_use]
    pub fn is_class(&self) -> bool {
        is_identifying_class(&self.0)
    }

    /// Whether this names an instance
    #[must_use]
    pub fn is_instance(&self) -> bool {
        is_identifying_instance(&self.0)
    }

    /// The provider class portion
    #[must_use]
    pub fn metadata_class(&self) -> &str {
        get_metadata_class(&self.0).unwrap_or_default()
    }

    /// The instance portion, if this is an instance identifier
    #[must_use]
    pub fn instance_key(&self) -> Option<&str> {
        get_metadata_instance(&self.0)
    }

    /// The class identifier this identifier belongs to
    #[must_use]
    pub fn class_id(&self) -> Self {
        Self(format!("{MID_PREFIX}{}", self.metadata_class()))
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MetadataId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MetadataId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MetadataId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<MetadataId> for String {
    fn from(id: MetadataId) -> Self {
        id.0
    }
}

// =========================================================================
// Physical-type scoped naming
// =========================================================================

/// Instance keys of the form `<logical-path>?<fully-qualified-type>`
pub mod naming {
    use super::{Error, JavaType, LogicalPath, MetadataId, Result};

    /// Separator between the logical path and the type name
    pub const PATH_TYPE_SEPARATOR: char = '?';

    /// Build the identifier a provider uses for one type in one path
    pub fn create_identifier(
        provider_class: &str,
        java_type: &JavaType,
        path: &LogicalPath,
    ) -> Result<MetadataId> {
        MetadataId::for_instance(
            provider_class,
            &format!("{path}{PATH_TYPE_SEPARATOR}{java_type}"),
        )
    }

    /// Split an identifier produced by [`create_identifier`]
    pub fn parse(provider_class: &str, id: &MetadataId) -> Result<(LogicalPath, JavaType)> {
        if id.metadata_class() != provider_class {
            return Err(Error::MalformedIdentifier(format!(
                "{id} is not provided by {provider_class}"
            )));
        }
        let key = id
            .instance_key()
            .ok_or_else(|| Error::NotAnInstance(id.to_string()))?;
        let (path, type_name) = key
            .split_once(PATH_TYPE_SEPARATOR)
            .ok_or_else(|| Error::MalformedIdentifier(id.to_string()))?;
        if path.is_empty() || type_name.is_empty() {
            return Err(Error::MalformedIdentifier(id.to_string()));
        }
        Ok((LogicalPath::parse(path), JavaType::new(type_name)))
    }

    /// Java type encoded in an identifier
    pub fn java_type(provider_class: &str, id: &MetadataId) -> Result<JavaType> {
        parse(provider_class, id).map(|(_, java_type)| java_type)
    }

    /// Logical path encoded in an identifier
    pub fn logical_path(provider_class: &str, id: &MetadataId) -> Result<LogicalPath> {
        parse(provider_class, id).map(|(path, _)| path)
    }
}

/// Identifiers of physical type metadata, the upstream of every ITD
pub struct PhysicalTypeIdentifier;

impl PhysicalTypeIdentifier {
    /// Provider class of physical type metadata
    pub const PROVIDES_TYPE: &'static str = "org.springframework.roo.classpath.PhysicalTypeIdentifier";

    /// The class identifier `MID:...PhysicalTypeIdentifier`
    #[must_use]
    pub fn class_id() -> MetadataId {
        MetadataId::of_class(Self::PROVIDES_TYPE)
    }

    /// Identifier of one physical type
    pub fn create(java_type: &JavaType, path: &LogicalPath) -> Result<MetadataId> {
        naming::create_identifier(Self::PROVIDES_TYPE, java_type, path)
    }

    /// Whether the identifier is a physical type instance
    #[must_use]
    pub fn is_valid(id: &MetadataId) -> bool {
        id.is_instance() && id.metadata_class() == Self::PROVIDES_TYPE
    }

    /// Split a physical type identifier into path and type
    pub fn parse(id: &MetadataId) -> Result<(LogicalPath, JavaType)> {
        naming::parse(Self::PROVIDES_TYPE, id)
    }
}
