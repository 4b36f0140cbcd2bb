//! The set of finalized archives on disk.

use super::{ARCHIVE_SUFFIX, ArchiveMetadata, META_JSON, STAGING_PREFIX, check_archive_id};
use crate::error::{Result, VaultError};
use crate::stats::ArchiveStats;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Result of scanning the archive directory.
#[derive(Debug, Default)]
pub struct Listing {
    /// Readable archives, newest first.
    pub archives: Vec<ArchiveMetadata>,
    /// One message per archive that could not be read.
    pub problems: Vec<String>,
}

/// Read-side access to `backups/`. Mutation (finalize, delete) happens
/// under the vault's archive lock.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backups directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public path of an archive.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{ARCHIVE_SUFFIX}"))
    }

    /// Path of an archive that exists, after checking the id.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidRequest`] for a malformed id,
    /// [`VaultError::NotFound`] when no such archive exists.
    pub fn existing_path(&self, id: &str) -> Result<PathBuf> {
        check_archive_id(id)?;
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(VaultError::NotFound(format!("backup '{id}' not found")));
        }
        Ok(path)
    }

    /// Read the embedded metadata of the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] if the zip or its `meta.json` is
    /// unreadable.
    pub fn read_metadata(path: &Path) -> Result<ArchiveMetadata> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| VaultError::Validation(format!("unreadable archive: {e}")))?;
        let mut member = archive
            .by_name(META_JSON)
            .map_err(|e| VaultError::Validation(format!("{META_JSON} not readable: {e}")))?;
        let mut buf = Vec::new();
        member.read_to_end(&mut buf)?;
        serde_json::from_slice(&buf)
            .map_err(|e| VaultError::Validation(format!("invalid {META_JSON}: {e}")))
    }

    /// Scan every finalized archive, optionally for one owner.
    ///
    /// Staging directories and `.zip.part` files are never listed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be read. A
    /// missing directory is an empty listing.
    pub fn scan(&self, owner: Option<&str>) -> Result<Listing> {
        let mut listing = Listing::default();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(ARCHIVE_SUFFIX) || name.starts_with(STAGING_PREFIX) {
                continue;
            }
            match Self::read_metadata(&entry.path()) {
                Ok(meta) => {
                    if owner.is_none_or(|o| meta.owner_id == o) {
                        listing.archives.push(meta);
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "skipping unreadable archive");
                    listing.problems.push(format!("corrupted backup file {name}: {e}"));
                }
            }
        }

        listing.archives.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(listing)
    }

    /// Statistics recorded in an archive.
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, `NotFound`, or `Validation` if the metadata is unreadable.
    pub fn stats(&self, id: &str) -> Result<ArchiveStats> {
        let path = self.existing_path(id)?;
        Ok(Self::read_metadata(&path)?.stats)
    }

    /// Raw bytes of an archive.
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, `NotFound`, or an I/O error.
    pub fn read_bytes(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.existing_path(id)?;
        Ok(std::fs::read(path)?)
    }

    /// Remove one archive. Returns `false` if it did not exist.
    ///
    /// Callers must hold the archive lock.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a malformed id or an I/O error from the delete.
    pub fn remove(&self, id: &str) -> Result<bool> {
        check_archive_id(id)?;
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
