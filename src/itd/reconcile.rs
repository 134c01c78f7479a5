// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Write-if-changed upkeep of generated ITD files
//!
//! Proposed content is compared by SHA-256 fingerprint with what was last
//! written (or, failing that, with what is on disk) so an unchanged ITD is
//! never rewritten. Line endings are normalised before fingerprinting.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Disk access used by the reconciler and the deletion sweep
pub trait FileManager: Send + Sync {
    /// Whether a file exists
    fn exists(&self, path: &Path) -> bool;
    /// Whole file as text
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Replace a file's contents, creating parent directories
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
    /// Remove a file
    fn delete(&self, path: &Path) -> Result<()>;
    /// Files directly inside a directory; empty when the directory is missing
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// [`FileManager`] over the real file system
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileManager;

impl FileManager for DiskFileManager {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| Error::io(path, e))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !dir.is_dir() {
            return Ok(files);
        }
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// What a reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// The file did not exist and was written
    Created,
    /// The file existed with different content and was rewritten
    Updated,
    /// The file existed and was removed
    Deleted,
    /// Nothing to do
    Unchanged,
}

/// Reconciliation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Files written for the first time
    pub created: u64,
    /// Files rewritten
    pub updated: u64,
    /// Files removed
    pub deleted: u64,
    /// Requests that needed no disk change
    pub skipped: u64,
}

/// Keeps generated files in line with proposed content
pub struct ItdFileReconciler {
    files: Arc<dyn FileManager>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    fingerprints: Mutex<HashMap<PathBuf, String>>,
    stats: Mutex<ReconcileStats>,
}

impl ItdFileReconciler {
    /// Reconciler writing through the given file manager
    #[must_use]
    pub fn new(files: Arc<dyn FileManager>) -> Self {
        Self {
            files,
            locks: Mutex::new(HashMap::new()),
            fingerprints: Mutex::new(HashMap::new()),
            stats: Mutex::new(ReconcileStats::default()),
        }
    }

    /// The file manager in use
    #[must_use]
    pub fn file_manager(&self) -> &Arc<dyn FileManager> {
        &self.files
    }

    /// Bring `path` in line with `proposed`; `None` or blank content removes the file
    pub fn reconcile(&self, path: &Path, proposed: Option<&str>) -> Result<ReconcileOutcome> {
        let lock = self.lock_for(path);
        let outcome = {
            let _guard = lock.lock();
            match proposed.filter(|c| !c.trim().is_empty()) {
                None => self.remove(path),
                Some(content) => self.write_if_changed(path, content),
            }
        };
        if matches!(outcome, Ok(ReconcileOutcome::Deleted | ReconcileOutcome::Unchanged))
            && !self.fingerprints.lock().contains_key(path)
        {
            self.release(path, lock);
        }
        let outcome = outcome?;

        let mut stats = self.stats.lock();
        match outcome {
            ReconcileOutcome::Created => stats.created += 1,
            ReconcileOutcome::Updated => stats.updated += 1,
            ReconcileOutcome::Deleted => stats.deleted += 1,
            ReconcileOutcome::Unchanged => stats.skipped += 1,
        }
        Ok(outcome)
    }

    /// Drop the remembered fingerprint of a path
    pub fn forget(&self, path: &Path) {
        self.fingerprints.lock().remove(path);
    }

    /// Re-check a generated file after an outside change.
    ///
    /// When the disk content no longer matches what was written, the
    /// remembered fingerprint is dropped so the next reconciliation rewrites it.
    pub fn observe(&self, path: &Path) {
        let Some(remembered) = self.fingerprints.lock().get(path).cloned() else {
            return;
        };
        let on_disk = self
            .files
            .read_to_string(path)
            .ok()
            .map(|content| fingerprint(&content));
        if on_disk.as_deref() != Some(remembered.as_str()) {
            debug!("{} changed outside the engine", path.display());
            self.forget(path);
        }
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> ReconcileStats {
        *self.stats.lock()
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drop the path's mutex once no other caller holds it
    fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    fn remove(&self, path: &Path) -> Result<ReconcileOutcome> {
        self.forget(path);
        if !self.files.exists(path) {
            return Ok(ReconcileOutcome::Unchanged);
        }
        self.files.delete(path)?;
        info!("Deleted {}", path.display());
        Ok(ReconcileOutcome::Deleted)
    }

    fn write_if_changed(&self, path: &Path, content: &str) -> Result<ReconcileOutcome> {
        let proposed = fingerprint(content);

        if !self.files.exists(path) {
            self.files.write(path, content)?;
            self.fingerprints.lock().insert(path.to_path_buf(), proposed);
            info!("Created {}", path.display());
            return Ok(ReconcileOutcome::Created);
        }

        let remembered = self.fingerprints.lock().get(path).cloned();
        let unchanged = match remembered {
            Some(previous) => previous == proposed,
            None => {
                let existing = self.files.read_to_string(path)?;
                fingerprint(&existing) == proposed
            }
        };
        if unchanged {
            self.fingerprints.lock().insert(path.to_path_buf(), proposed);
            return Ok(ReconcileOutcome::Unchanged);
        }

        self.files.write(path, content)?;
        self.fingerprints.lock().insert(path.to_path_buf(), proposed);
        info!("Updated {}", path.display());
        Ok(ReconcileOutcome::Updated)
    }
}

/// SHA-256 of content with `\r\n` folded to `\n`
#[must_use]
pub fn fingerprint(content: &str) -> String {
    let normalised = content.replace("\r\n", "\n");
    hex::encode(Sha256::digest(normalised.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reconciler() -> (TempDir, ItdFileReconciler) {
        let dir = TempDir::new().unwrap();
        (dir, ItdFileReconciler::new(Arc::new(DiskFileManager)))
    }

    #[test]
    fn test_create_then_skip() {
        let (dir, r) = reconciler();
        let path = dir.path().join("com/example/Bar_Roo_Foo.aj");

        assert_eq!(r.reconcile(&path, Some("aspect A {}\n")).unwrap(), ReconcileOutcome::Created);
        assert_eq!(r.reconcile(&path, Some("aspect A {}\n")).unwrap(), ReconcileOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), "aspect A {}\n");

        let stats = r.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_update_on_change() {
        let (dir, r) = reconciler();
        let path = dir.path().join("Bar_Roo_Foo.aj");

        r.reconcile(&path, Some("one\n")).unwrap();
        assert_eq!(r.reconcile(&path, Some("two\n")).unwrap(), ReconcileOutcome::Updated);
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");
    }

    #[test]
    fn test_existing_identical_file_not_rewritten() {
        let (dir, r) = reconciler();
        let path = dir.path().join("Bar_Roo_Foo.aj");
        fs::write(&path, "same\r\n").unwrap();

        assert_eq!(r.reconcile(&path, Some("same\n")).unwrap(), ReconcileOutcome::Unchanged);
        // the CRLF copy on disk is left alone
        assert_eq!(fs::read_to_string(&path).unwrap(), "same\r\n");
    }

    #[test]
    fn test_empty_content_deletes() {
        let (dir, r) = reconciler();
        let path = dir.path().join("Bar_Roo_Foo.aj");
        fs::write(&path, "old").unwrap();

        assert_eq!(r.reconcile(&path, Some("  \n")).unwrap(), ReconcileOutcome::Deleted);
        assert!(!path.exists());
        assert_eq!(r.reconcile(&path, None).unwrap(), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn test_removal_releases_path_state() {
        let (dir, r) = reconciler();
        let path = dir.path().join("Bar_Roo_Foo.aj");
        r.reconcile(&path, Some("generated\n")).unwrap();
        assert_eq!(r.locks.lock().len(), 1);
        assert_eq!(r.fingerprints.lock().len(), 1);

        assert_eq!(r.reconcile(&path, None).unwrap(), ReconcileOutcome::Deleted);
        assert!(r.locks.lock().is_empty());
        assert!(r.fingerprints.lock().is_empty());

        // removing a file that never existed leaves nothing behind either
        r.reconcile(&dir.path().join("Ghost_Roo_Foo.aj"), None).unwrap();
        assert!(r.locks.lock().is_empty());
    }

    #[test]
    fn test_observe_drops_stale_fingerprint() {
        let (dir, r) = reconciler();
        let path = dir.path().join("Bar_Roo_Foo.aj");
        r.reconcile(&path, Some("generated\n")).unwrap();

        fs::write(&path, "hand edited\n").unwrap();
        r.observe(&path);

        assert_eq!(r.reconcile(&path, Some("generated\n")).unwrap(), ReconcileOutcome::Updated);
        assert_eq!(fs::read_to_string(&path).unwrap(), "generated\n");
    }

    #[test]
    fn test_fingerprint_ignores_line_endings() {
        assert_eq!(fingerprint("a\r\nb\r\n"), fingerprint("a\nb\n"));
        assert_ne!(fingerprint("a\nb\n"), fingerprint("a\nc\n"));
    }

    #[test]
    fn test_list_dir_returns_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.java"), "").unwrap();
        fs::write(dir.path().join("a.java"), "").unwrap();

        let files = DiskFileManager.list_dir(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.java"), dir.path().join("b.java")]);
    }
}
