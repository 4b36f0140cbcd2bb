//! Archive creation and deletion.

pub mod orchestrator;
pub mod retention;
pub mod staging;

pub use orchestrator::BackupOrchestrator;
pub use retention::RetentionManager;

use std::sync::Arc;

/// Mutual exclusion for every mutation of the archive store and the
/// latest-stats cache.
pub type ArchiveLock = Arc<tokio::sync::Mutex<()>>;
