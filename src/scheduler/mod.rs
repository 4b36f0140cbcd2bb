//! Unattended backups.
//!
//! [`BackupScheduler`] owns one cancellable background task driven by the
//! persisted [`Schedule`].

pub mod runner;
pub mod store;

pub use runner::{BackupScheduler, RunReport, SLEEP_SLICE, ScheduleStatus};
pub use store::{Schedule, ScheduleStore};
