//! The single persisted schedule (`app_data/config.json`).

use crate::error::{Result, VaultError};
use crate::journal::LogJournal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// What the background task backs up, how many archives it keeps, and how
/// often it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Owner whose collection is backed up.
    #[serde(rename = "username")]
    pub owner_id: String,
    /// Archives retained for the owner.
    #[serde(rename = "keepLast")]
    pub keep_last: u32,
    /// Hours between runs.
    #[serde(rename = "interval")]
    pub interval_hours: f64,
}

impl Schedule {
    /// Build a schedule, rejecting values the scheduler cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidRequest`] for an owner that cannot name archives, a zero
    /// `keep_last`, or a non-positive or non-finite interval.
    pub fn new(owner_id: impl Into<String>, keep_last: u32, interval_hours: f64) -> Result<Self> {
        let schedule = Self {
            owner_id: owner_id.into().trim().to_owned(),
            keep_last,
            interval_hours,
        };
        schedule
            .check()
            .map_err(|reason| VaultError::InvalidRequest(reason.to_owned()))?;
        Ok(schedule)
    }

    fn check(&self) -> std::result::Result<(), &'static str> {
        if let Some(reason) = crate::archive::owner_id_problem(self.owner_id.trim()) {
            return Err(reason);
        }
        if self.keep_last == 0 {
            return Err("keepLast must be a positive integer");
        }
        if !(self.interval_hours.is_finite() && self.interval_hours > 0.0) {
            return Err("interval must be a positive number of hours");
        }
        Ok(())
    }

    /// Usable owner, positive retention and positive interval.
    pub fn is_well_formed(&self) -> bool {
        self.check().is_ok()
    }

    /// Interval between runs.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_hours * 3600.0).unwrap_or(Duration::MAX)
    }
}

/// Persists the active [`Schedule`].
pub struct ScheduleStore {
    path: PathBuf,
    journal: Arc<LogJournal>,
}

impl ScheduleStore {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>, journal: Arc<LogJournal>) -> Self {
        Self {
            path: path.into(),
            journal,
        }
    }

    /// Whether a schedule document exists, valid or not.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// The persisted schedule.
    ///
    /// Missing, malformed and incomplete documents all read as `None`; the
    /// latter two are journaled.
    pub fn load(&self) -> Option<Schedule> {
        match crate::persist::read_json::<Schedule>(&self.path) {
            Ok(schedule) => schedule,
            Err(e) => {
                self.journal.append(
                    format!("Schedule file {} is malformed, ignoring: {e}", self.path.display()),
                    false,
                );
                None
            }
        }
    }

    /// Overwrite the persisted schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn save(&self, schedule: &Schedule) -> Result<()> {
        crate::persist::write_json(&self.path, schedule)
    }

    /// Remove the persisted schedule. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        crate::persist::remove(&self.path)
    }
}
