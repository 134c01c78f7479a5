// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Inter-type declarations: model, rendering, providers and file upkeep

pub mod composer;
pub mod deletion;
pub mod provider;
pub mod reconcile;

use crate::id::MetadataId;
use crate::service::MetadataItem;
use crate::types::JavaType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use composer::ItdSourceFileComposer;
pub use deletion::ItdFileDeletionService;
pub use provider::{ItdMetadataFactory, ItdTriggerBasedProvider};
pub use reconcile::{DiskFileManager, FileManager, ItdFileReconciler, ReconcileOutcome};

/// Marker between the governor name and the provider suffix
pub const ITD_MARKER: &str = "_Roo_";

/// Extension of generated ITD files
pub const ITD_EXTENSION: &str = "aj";

/// Extension of governor source files
pub const JAVA_EXTENSION: &str = "java";

/// File name of the ITD a provider generates for a governor, e.g. `Foo_Roo_JavaBean.aj`
#[must_use]
pub fn itd_file_name(governor_simple_name: &str, suffix: &str) -> String {
    format!("{governor_simple_name}{ITD_MARKER}{suffix}.{ITD_EXTENSION}")
}

/// Whether a path names a generated ITD file
#[must_use]
pub fn is_itd_file(path: &Path) -> bool {
    governor_simple_name(path).is_some()
}

/// Governor simple name encoded in an ITD file name (`Foo` for `Foo_Roo_JavaBean.aj`)
#[must_use]
pub fn governor_simple_name(itd_path: &Path) -> Option<&str> {
    if itd_path.extension()?.to_str()? != ITD_EXTENSION {
        return None;
    }
    let stem = itd_path.file_stem()?.to_str()?;
    let (prefix, suffix) = stem.split_once(ITD_MARKER)?;
    (!prefix.is_empty() && !suffix.is_empty()).then_some(prefix)
}

/// The `.java` file an ITD file belongs to, in the same directory
#[must_use]
pub fn governor_path(itd_path: &Path) -> Option<PathBuf> {
    let simple = governor_simple_name(itd_path)?;
    Some(itd_path.with_file_name(format!("{simple}.{JAVA_EXTENSION}")))
}

// =========================================================================
// Type details
// =========================================================================

/// A field introduced into the governor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItdField {
    /// Annotations, rendered verbatim (e.g. `@Transient`)
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Modifiers, e.g. `private`
    pub modifiers: String,
    /// Field type
    pub field_type: String,
    /// Field name
    pub name: String,
    /// Initializer expression
    pub initializer: Option<String>,
}

/// A method introduced into the governor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItdMethod {
    /// Annotations, rendered verbatim
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Modifiers, e.g. `public`
    pub modifiers: String,
    /// Return type
    pub return_type: String,
    /// Method name
    pub name: String,
    /// `(type, name)` pairs
    #[serde(default)]
    pub parameters: Vec<(String, String)>,
    /// Body statements, one per line, without indentation
    #[serde(default)]
    pub body: Vec<String>,
}

impl ItdMethod {
    /// A public method with the given signature and body
    pub fn public(
        return_type: impl Into<String>,
        name: impl Into<String>,
        parameters: Vec<(String, String)>,
        body: Vec<String>,
    ) -> Self {
        Self {
            annotations: Vec::new(),
            modifiers: "public".into(),
            return_type: return_type.into(),
            name: name.into(),
            parameters,
            body,
        }
    }
}

/// Everything an ITD weaves into its governor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItdTypeDetails {
    /// The aspect type, e.g. `com.example.Foo_Roo_JavaBean`
    pub aspect: JavaType,
    /// The governor type
    pub governor: JavaType,
    /// Whether the aspect is declared `privileged`
    pub privileged: bool,
    /// Imports needed by member types
    #[serde(default)]
    pub imports: BTreeSet<String>,
    /// `declare parents: Governor extends ...`
    #[serde(default)]
    pub extends_types: Vec<String>,
    /// `declare parents: Governor implements ...`
    #[serde(default)]
    pub implements_types: Vec<String>,
    /// `declare @type: Governor: ...`
    #[serde(default)]
    pub type_annotations: Vec<String>,
    /// Introduced fields
    #[serde(default)]
    pub fields: Vec<ItdField>,
    /// Introduced methods
    #[serde(default)]
    pub methods: Vec<ItdMethod>,
}

impl ItdTypeDetails {
    /// Empty details for an aspect targeting a governor
    #[must_use]
    pub fn new(aspect: JavaType, governor: JavaType) -> Self {
        Self {
            aspect,
            governor,
            privileged: true,
            imports: BTreeSet::new(),
            extends_types: Vec::new(),
            implements_types: Vec::new(),
            type_annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Whether the ITD contributes nothing to its governor
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extends_types.is_empty()
            && self.implements_types.is_empty()
            && self.type_annotations.is_empty()
            && self.fields.is_empty()
            && self.methods.is_empty()
    }
}

// =========================================================================
// Metadata item
// =========================================================================

/// Metadata item produced by an ITD provider
#[derive(Debug, Clone)]
pub struct ItdMetadata {
    id: MetadataId,
    governor_physical_type: MetadataId,
    itd_path: PathBuf,
    details: Option<ItdTypeDetails>,
    valid: bool,
}

impl ItdMetadata {
    /// A valid item; `None` details means no ITD is required
    #[must_use]
    pub fn new(
        id: MetadataId,
        governor_physical_type: MetadataId,
        itd_path: PathBuf,
        details: Option<ItdTypeDetails>,
    ) -> Self {
        Self {
            id,
            governor_physical_type,
            itd_path,
            details,
            valid: true,
        }
    }

    /// An item the provider could not produce properly
    #[must_use]
    pub fn invalid(id: MetadataId, governor_physical_type: MetadataId, itd_path: PathBuf) -> Self {
        Self {
            valid: false,
            ..Self::new(id, governor_physical_type, itd_path, None)
        }
    }

    /// Physical type identifier of the governor
    #[must_use]
    pub fn governor_physical_type(&self) -> &MetadataId {
        &self.governor_physical_type
    }

    /// Where the ITD lives on disk
    #[must_use]
    pub fn itd_path(&self) -> &Path {
        &self.itd_path
    }

    /// Rendered ITD source, `None` when there is nothing to write
    #[must_use]
    pub fn rendered(&self) -> Option<String> {
        self.details
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(|d| ItdSourceFileComposer::new(d).output())
    }
}

impl MetadataItem for ItdMetadata {
    fn id(&self) -> &MetadataId {
        &self.id
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn fingerprint(&self) -> Option<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_str().as_bytes());
        hasher.update([u8::from(self.valid)]);
        if let Some(rendered) = self.rendered() {
            hasher.update(rendered.as_bytes());
        }
        Some(hex::encode(hasher.finalize()))
    }

    fn itd_type_details(&self) -> Option<&ItdTypeDetails> {
        self.details.as_ref()
    }
}
