//! Small JSON documents under `app_data/`.

use crate::error::{Result, VaultError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`VaultError::Io`] if the file cannot be read and
/// [`VaultError::Config`] if it does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| VaultError::Config(format!("cannot parse {}: {e}", path.display())))
}

/// Serialise `value` as pretty JSON and replace `path` with it.
///
/// The document is written to a sibling `.tmp` file first and renamed into
/// place, so readers never observe a half-written file.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| VaultError::Storage(format!("cannot serialize {}: {e}", path.display())))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove `path`. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns an I/O error for anything other than a missing file.
pub fn remove(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
