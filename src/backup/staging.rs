//! Scratch locations used while an archive is assembled.
//!
//! Both guards remove what they own when dropped unless told otherwise, so
//! an early return or a panic never leaves a staging directory or a
//! half-packed archive behind.

use crate::archive::{PART_SUFFIX, STAGING_PREFIX};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// A private directory under `backups/` holding the members of one archive.
pub struct StagingArea {
    path: PathBuf,
    removed: bool,
}

impl StagingArea {
    /// Create `<backups>/_TEMP_<id>/`, replacing leftovers from a crashed run.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(backups_dir: &Path, id: &str) -> Result<Self> {
        let path = backups_dir.join(format!("{STAGING_PREFIX}{id}"));
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one member.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        std::fs::write(self.path.join(name), contents)?;
        Ok(())
    }

    /// Delete the directory and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging area");
            }
        }
    }
}

/// `<backups>/<id>.zip.part` until [`PendingArchive::finalize`] renames it.
pub struct PendingArchive {
    part: PathBuf,
    finalized: bool,
}

impl PendingArchive {
    /// Reserve the part path for `id`.
    pub fn new(backups_dir: &Path, id: &str) -> Self {
        Self {
            part: backups_dir.join(format!("{id}{PART_SUFFIX}")),
            finalized: false,
        }
    }

    /// Part file path.
    pub fn path(&self) -> &Path {
        &self.part
    }

    /// Atomically move the part file to its public name.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails; the part file is then removed
    /// on drop.
    pub fn finalize(mut self, target: &Path) -> Result<()> {
        std::fs::rename(&self.part, target)?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for PendingArchive {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.part) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.part.display(), error = %e, "failed to remove partial archive");
            }
        }
    }
}
