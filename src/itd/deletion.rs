// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Removal of ITD files whose governor no longer exists

use super::{
    governor_path, is_itd_file, ItdFileReconciler, ReconcileOutcome, ITD_EXTENSION, ITD_MARKER,
    JAVA_EXTENSION,
};
use crate::error::Result;
use crate::monitor::{FileEvent, FileEventListener, FileOperation};
use globset::Glob;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Deletes orphaned `*_Roo_*.aj` files as file events arrive
pub struct ItdFileDeletionService {
    reconciler: Arc<ItdFileReconciler>,
}

impl ItdFileDeletionService {
    /// Service deleting through the reconciler, so remembered fingerprints stay consistent
    #[must_use]
    pub fn new(reconciler: Arc<ItdFileReconciler>) -> Self {
        Self { reconciler }
    }

    /// Delete an ITD file if its governor is missing; returns whether it was deleted
    pub fn delete_if_orphaned(&self, itd: &Path) -> Result<bool> {
        let Some(governor) = governor_path(itd) else {
            return Ok(false);
        };
        let files = self.reconciler.file_manager();
        if files.exists(&governor) {
            self.reconciler.observe(itd);
            return Ok(false);
        }
        if !files.exists(itd) {
            return Ok(false);
        }
        info!("Removing {}: governor {} is gone", itd.display(), governor.display());
        let outcome = self.reconciler.reconcile(itd, None)?;
        Ok(outcome == ReconcileOutcome::Deleted)
    }

    /// Delete every `<Governor>_Roo_*.aj` next to a removed governor
    pub fn delete_itds_of(&self, java_file: &Path) -> Result<Vec<PathBuf>> {
        let stem = java_file.file_stem().and_then(|s| s.to_str());
        let (Some(dir), Some(stem)) = (java_file.parent(), stem) else {
            return Ok(Vec::new());
        };
        let files = self.reconciler.file_manager();

        let matcher = Glob::new(&format!("{stem}{ITD_MARKER}*.{ITD_EXTENSION}"))?.compile_matcher();
        let mut deleted = Vec::new();
        for file in files.list_dir(dir)? {
            let Some(name) = file.file_name() else {
                continue;
            };
            if !matcher.is_match(name) {
                continue;
            }
            if self.reconciler.reconcile(&file, None)? == ReconcileOutcome::Deleted {
                info!("Removed {} with its governor", file.display());
                deleted.push(file);
            }
        }
        Ok(deleted)
    }
}

fn is_java_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(JAVA_EXTENSION)
}

impl FileEventListener for ItdFileDeletionService {
    fn on_file_event(&self, event: &FileEvent) {
        let result = match event.operation {
            FileOperation::Created | FileOperation::Updated | FileOperation::Renamed
                if is_itd_file(&event.path) =>
            {
                self.delete_if_orphaned(&event.path).map(|_| ())
            }
            FileOperation::Deleted if is_java_file(&event.path) => {
                self.delete_itds_of(&event.path).map(|_| ())
            }
            FileOperation::Renamed => match &event.previous_path {
                Some(previous) if is_java_file(previous) => {
                    self.delete_itds_of(previous).map(|_| ())
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(
                "ITD cleanup after {:?} of {} failed: {}",
                event.operation,
                event.path.display(),
                e
            );
        }
    }
}
