//! Member validation shared by the pre-pack and post-pack passes.
//!
//! Both passes run the same checks through [`MemberSource`], so an archive
//! that passes in its staging directory passes again once packed unless the
//! packing itself damaged it.

use super::MEMBERS;
use crate::error::{Result, VaultError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Somewhere members can be read from by name.
pub trait MemberSource {
    /// Read a member, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the member exists but cannot be read.
    fn read_member(&mut self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Members stored as plain files in a directory.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    /// Read members from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MemberSource for DirSource {
    fn read_member(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }
}

/// Members stored in a zip archive.
pub struct ZipSource {
    archive: ZipArchive<File>,
}

impl ZipSource {
    /// Open the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] if the file is not a readable zip.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| VaultError::Validation(format!("unreadable archive: {e}")))?;
        Ok(Self { archive })
    }
}

impl MemberSource for ZipSource {
    fn read_member(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut member = match self.archive.by_name(name) {
            Ok(member) => member,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(VaultError::Validation(format!(
                    "cannot read member {name}: {e}"
                )));
            }
        };
        let mut buf = Vec::new();
        member
            .read_to_end(&mut buf)
            .map_err(|e| VaultError::Validation(format!("corrupt member {name}: {e}")))?;
        Ok(Some(buf))
    }
}

/// Whether a parsed JSON value counts as empty.
fn is_empty_json(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Check every required member of `source`.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] naming the first member that is
/// missing, empty, or (for `.json` members) unparseable or empty once parsed.
pub fn validate_members(source: &mut dyn MemberSource) -> Result<()> {
    for name in MEMBERS {
        let bytes = source
            .read_member(name)?
            .ok_or_else(|| VaultError::Validation(format!("missing required member: {name}")))?;
        if bytes.is_empty() {
            return Err(VaultError::Validation(format!("empty member: {name}")));
        }
        if name.ends_with(".json") {
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| VaultError::Validation(format!("invalid JSON in {name}: {e}")))?;
            if is_empty_json(&value) {
                return Err(VaultError::Validation(format!(
                    "empty JSON content in {name}"
                )));
            }
        }
    }
    Ok(())
}

/// Validate a staging directory before packing.
///
/// # Errors
///
/// See [`validate_members`].
pub fn validate_staging(dir: &Path) -> Result<()> {
    validate_members(&mut DirSource::new(dir))
}

/// Validate a packed archive by reading it back.
///
/// # Errors
///
/// See [`validate_members`]; an unreadable zip is also a validation error.
pub fn validate_packed(path: &Path) -> Result<()> {
    validate_members(&mut ZipSource::open(path)?)
}
