//! Scheduler background loop.
//!
//! At most one tokio task runs at a time. It creates an archive for the
//! active [`Schedule`], prunes old archives, then sleeps for the interval in
//! slices of at most [`SLEEP_SLICE`] while watching its cancellation token.
//! Errors inside a run are journaled and never end the loop.

use crate::archive::ArchiveMetadata;
use crate::backup::{BackupOrchestrator, RetentionManager};
use crate::config::SchedulerConfig;
use crate::error::{Result, VaultError};
use crate::journal::LogJournal;
use crate::scheduler::store::{Schedule, ScheduleStore};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest uninterrupted sleep between cancellation checks.
pub const SLEEP_SLICE: Duration = Duration::from_secs(60);

/// Scheduler state as reported to the request layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleStatus {
    /// Whether the background task is active.
    pub running: bool,
    /// The running schedule, or the persisted one when idle.
    pub schedule: Option<Schedule>,
}

/// Outcome of one scheduled run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Archive created by the run.
    pub archive: ArchiveMetadata,
    /// Archives removed by retention afterwards.
    pub pruned: Vec<String>,
}

/// State shared between the scheduler handle and its background task.
struct TaskContext {
    orchestrator: Arc<BackupOrchestrator>,
    retention: Arc<RetentionManager>,
    store: ScheduleStore,
    journal: Arc<LogJournal>,
    current: Mutex<Option<Schedule>>,
    idle_recheck: Duration,
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningTask {
    fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

/// Owns the single background backup task.
pub struct BackupScheduler {
    ctx: Arc<TaskContext>,
    stop_timeout: Duration,
    task: tokio::sync::Mutex<Option<RunningTask>>,
}

impl BackupScheduler {
    /// Create an idle scheduler.
    pub fn new(
        orchestrator: Arc<BackupOrchestrator>,
        retention: Arc<RetentionManager>,
        store: ScheduleStore,
        journal: Arc<LogJournal>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(TaskContext {
                orchestrator,
                retention,
                store,
                journal,
                current: Mutex::new(None),
                idle_recheck: config.idle_recheck(),
            }),
            stop_timeout: config.stop_timeout(),
            task: tokio::sync::Mutex::new(None),
        }
    }

    /// Start (or restart) the background task for `schedule`.
    ///
    /// A running task is stopped and awaited, within the stop timeout,
    /// before the new one is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidRequest`] if the schedule is not
    /// runnable.
    pub async fn start(&self, schedule: Schedule) -> Result<Schedule> {
        if !schedule.is_well_formed() {
            let err = VaultError::InvalidRequest(format!(
                "schedule for '{}' needs a username, keepLast > 0 and interval > 0",
                schedule.owner_id
            ));
            self.ctx
                .journal
                .append(format!("Auto-backup start rejected: {err}"), false);
            return Err(err);
        }

        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            if running.is_active() {
                self.ctx.journal.append(
                    "Stopping existing auto-backup task before starting new one.",
                    true,
                );
            }
            self.halt(running).await;
        }

        self.ctx.set_current(Some(schedule.clone()));
        if let Err(e) = self.ctx.store.save(&schedule) {
            self.ctx
                .journal
                .append(format!("Error saving schedule: {e}"), false);
        }
        *task = Some(self.spawn_task());

        self.ctx.journal.append(
            format!(
                "Auto backup started for {}, interval: {} hours, keep: {}",
                schedule.owner_id, schedule.interval_hours, schedule.keep_last
            ),
            true,
        );
        Ok(schedule)
    }

    /// Stop the background task and discard the schedule.
    ///
    /// Returns `false` without side effects when already idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted schedule cannot be removed.
    pub async fn stop(&self) -> Result<bool> {
        let mut task = self.task.lock().await;
        let Some(running) = task.take() else {
            return Ok(false);
        };
        if !running.is_active() {
            return Ok(false);
        }

        self.ctx.journal.append("Stopping auto backup...", true);
        self.halt(running).await;
        self.ctx.set_current(None);

        if let Err(e) = self.ctx.store.clear() {
            self.ctx
                .journal
                .append(format!("Error removing schedule: {e}"), false);
            return Err(e);
        }
        self.ctx.journal.append("Auto backup stopped.", true);
        Ok(true)
    }

    /// Stop the background task but keep the persisted schedule so the
    /// next process resumes it.
    pub async fn shutdown(&self) {
        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            info!("shutting down backup scheduler");
            self.halt(running).await;
        }
    }

    /// Whether the task is running, and with which schedule.
    pub async fn status(&self) -> ScheduleStatus {
        let task = self.task.lock().await;
        let running = task.as_ref().is_some_and(RunningTask::is_active);
        let schedule = if running {
            self.ctx.current()
        } else {
            self.ctx.store.load()
        };
        ScheduleStatus { running, schedule }
    }

    /// Resume the persisted schedule at process start, or discard it when
    /// it is not runnable. Returns whether a task was started.
    pub async fn resume_from_store(&self) -> bool {
        let journal = &self.ctx.journal;
        match self.ctx.store.load() {
            Some(schedule) if schedule.is_well_formed() => {
                let owner = schedule.owner_id.clone();
                let (interval, keep) = (schedule.interval_hours, schedule.keep_last);
                match self.start(schedule).await {
                    Ok(_) => {
                        journal.append(
                            format!(
                                "Restored auto backup for '{owner}' on start. Interval: {interval}h, Keep: {keep}."
                            ),
                            true,
                        );
                        true
                    }
                    Err(_) => false,
                }
            }
            Some(schedule) => {
                journal.append(
                    format!(
                        "Stored auto-backup schedule for '{}' is invalid (Keep: {}, Interval: {}). Not started.",
                        schedule.owner_id, schedule.keep_last, schedule.interval_hours
                    ),
                    false,
                );
                self.discard_stored();
                false
            }
            None if self.ctx.store.exists() => {
                self.discard_stored();
                false
            }
            None => {
                journal.append("No auto-backup schedule found on start.", true);
                false
            }
        }
    }

    /// Create an archive for `schedule` and prune, as one scheduled run does.
    ///
    /// # Errors
    ///
    /// Propagates archive creation and pruning errors.
    pub async fn run_once(&self, schedule: &Schedule) -> Result<RunReport> {
        self.ctx.run_once(schedule).await
    }

    fn discard_stored(&self) {
        match self.ctx.store.clear() {
            Ok(_) => self
                .ctx
                .journal
                .append("Removed invalid auto-backup schedule.", true),
            Err(e) => self
                .ctx
                .journal
                .append(format!("Error removing invalid schedule: {e}"), false),
        };
    }

    fn spawn_task(&self) -> RunningTask {
        let cancel = CancellationToken::new();
        let ctx = Arc::clone(&self.ctx);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { ctx.run_loop(token).await });
        RunningTask { cancel, handle }
    }

    /// Signal the task and wait at most `stop_timeout` for it to exit.
    async fn halt(&self, mut running: RunningTask) {
        running.cancel.cancel();
        match tokio::time::timeout(self.stop_timeout, &mut running.handle).await {
            Ok(Ok(())) => debug!("backup task exited"),
            Ok(Err(e)) => warn!(error = %e, "backup task ended abnormally"),
            Err(_) => {
                warn!(timeout = ?self.stop_timeout, "backup task did not stop in time");
                self.ctx.journal.append(
                    format!(
                        "Backup task did not stop within {}s; it will exit at its next check.",
                        self.stop_timeout.as_secs()
                    ),
                    false,
                );
            }
        }
    }
}

impl TaskContext {
    fn current(&self) -> Option<Schedule> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_current(&self, schedule: Option<Schedule>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = schedule;
    }

    async fn run_once(&self, schedule: &Schedule) -> Result<RunReport> {
        let archive = self
            .orchestrator
            .create_archive(&schedule.owner_id)
            .await?;
        let pruned = self
            .retention
            .prune(&schedule.owner_id, schedule.keep_last as usize)
            .await?;
        Ok(RunReport { archive, pruned })
    }

    async fn run_loop(&self, cancel: CancellationToken) {
        info!("backup scheduler task started");
        while !cancel.is_cancelled() {
            let Some(schedule) = self.current() else {
                self.journal
                    .append("Auto backup task: no schedule configured, waiting.", false);
                if sleep_sliced(self.idle_recheck, &cancel).await {
                    break;
                }
                continue;
            };

            if schedule.owner_id.trim().is_empty() {
                self.journal
                    .append("Auto backup task: username missing in schedule. Stopping task.", false);
                self.set_current(None);
                if let Err(e) = self.store.clear() {
                    self.journal
                        .append(format!("Error removing schedule: {e}"), false);
                }
                cancel.cancel();
                break;
            }

            self.journal.append(
                format!("Auto backup task: starting backup for {}.", schedule.owner_id),
                true,
            );
            match self.run_once(&schedule).await {
                Ok(report) => debug!(
                    archive_id = %report.archive.id,
                    pruned = report.pruned.len(),
                    "scheduled run complete"
                ),
                Err(e) => {
                    self.journal.append(
                        format!(
                            "Auto backup task error during backup/cleanup for {}: {e}",
                            schedule.owner_id
                        ),
                        false,
                    );
                }
            }

            if sleep_sliced(schedule.interval(), &cancel).await {
                break;
            }
        }
        info!("backup scheduler task stopped");
    }
}

/// Sleep for `total`, one [`SLEEP_SLICE`] at a time. Returns `true` if
/// cancelled before the time elapsed.
///
/// A `total` past the timer's range never elapses.
async fn sleep_sliced(total: Duration, cancel: &CancellationToken) -> bool {
    let Some(deadline) = Instant::now().checked_add(total) else {
        cancel.cancelled().await;
        return true;
    };
    loop {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let step = (deadline - now).min(SLEEP_SLICE);
        tokio::select! {
            _ = cancel.cancelled() => return true,
            _ = tokio::time::sleep(step) => {}
        }
    }
}
