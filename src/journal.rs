//! Bounded, durable operational journal.
//!
//! This is the user-facing activity log surfaced by the request layer. It is
//! separate from diagnostic `tracing` output, though every append is
//! mirrored there too.

use crate::events::{EventNotifier, VaultEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// Default number of entries kept.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Human-readable message.
    pub message: String,
    /// Whether the entry reports a success.
    #[serde(rename = "is_success")]
    pub success: bool,
}

/// Append-only journal persisted as a JSON array, oldest first.
pub struct LogJournal {
    path: PathBuf,
    max_entries: usize,
    notifier: EventNotifier,
    // Serialises read-modify-write of the file.
    lock: Mutex<()>,
}

impl LogJournal {
    /// Journal stored at `path`, keeping the newest `max_entries`.
    pub fn new(path: impl Into<PathBuf>, max_entries: usize, notifier: EventNotifier) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(1),
            notifier,
            lock: Mutex::new(()),
        }
    }

    /// Append an entry, truncate, persist, and publish `log_updated`.
    ///
    /// Persistence failures are reported through `tracing` only; journaling
    /// never fails its caller.
    pub fn append(&self, message: impl Into<String>, success: bool) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
            success,
        };

        if success {
            tracing::info!(target: "anivault::journal", "{}", entry.message);
        } else {
            tracing::warn!(target: "anivault::journal", "{}", entry.message);
        }

        {
            let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut entries = self.load();
            entries.push(entry.clone());
            if entries.len() > self.max_entries {
                let drop_count = entries.len().saturating_sub(self.max_entries);
                entries.drain(0..drop_count);
            }
            if let Err(e) = crate::persist::write_json(&self.path, &entries) {
                tracing::error!(error = %e, path = %self.path.display(), "cannot persist journal");
            }
        }

        self.notifier.publish(VaultEvent::LogUpdated(entry.clone()));
        entry
    }

    /// All stored entries, oldest first.
    pub fn list(&self) -> Vec<LogEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load()
    }

    /// Read the file; a corrupt or unreadable journal is treated as empty.
    fn load(&self) -> Vec<LogEntry> {
        match crate::persist::read_json::<Vec<LogEntry>>(&self.path) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "journal unreadable, starting with empty log"
                );
                Vec::new()
            }
        }
    }
}
