//! In-process fan-out of state-change notifications.
//!
//! Every [`EventNotifier::subscribe`] call gets its own broadcast receiver,
//! so concurrent observers each see every event. Dropping the returned
//! stream drops the receiver; nothing else needs cleaning up.

use crate::archive::ArchiveMetadata;
use crate::journal::LogEntry;
use crate::latest::LatestStats;
use futures_util::stream::Stream;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// A state change observers may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum VaultEvent {
    /// A journal entry was appended.
    LogUpdated(LogEntry),
    /// An archive was finalized.
    BackupCreated(ArchiveMetadata),
    /// An archive was deleted (manually or by retention).
    BackupDeleted {
        /// Id of the deleted archive.
        id: String,
    },
    /// The latest-stats cache changed. `None` means it was cleared.
    LatestStatsUpdated(Option<LatestStats>),
    /// Synthetic event sent to a quiet observer.
    KeepAlive,
}

impl VaultEvent {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogUpdated(_) => "log_updated",
            Self::BackupCreated(_) => "backup_created",
            Self::BackupDeleted { .. } => "backup_deleted",
            Self::LatestStatsUpdated(_) => "latest_stats_updated",
            Self::KeepAlive => "keep-alive",
        }
    }

    /// JSON payload. Cleared or absent values are `{}`.
    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            Self::LogUpdated(entry) => serde_json::to_value(entry),
            Self::BackupCreated(meta) => serde_json::to_value(meta),
            Self::BackupDeleted { id } => Ok(serde_json::json!({ "id": id })),
            Self::LatestStatsUpdated(Some(stats)) => serde_json::to_value(stats),
            Self::LatestStatsUpdated(None) | Self::KeepAlive => Ok(serde_json::json!({})),
        };
        value.unwrap_or_else(|e| {
            tracing::warn!(event = self.kind(), error = %e, "cannot serialize event payload");
            serde_json::json!({})
        })
    }

    /// `{"type": kind, "data": payload}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "type": self.kind(), "data": self.payload() })
    }
}

/// Broadcast hub for [`VaultEvent`]s.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    tx: broadcast::Sender<VaultEvent>,
    keep_alive: Duration,
}

impl EventNotifier {
    /// Create a notifier with a per-observer buffer of `capacity` events.
    pub fn new(capacity: usize, keep_alive: Duration) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, keep_alive }
    }

    /// Send `event` to every current observer. Never blocks; with no
    /// observers the event is dropped.
    pub fn publish(&self, event: VaultEvent) {
        tracing::debug!(event = event.kind(), "publishing event");
        let _ = self.tx.send(event);
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw receiver without keep-alives.
    pub fn receiver(&self) -> broadcast::Receiver<VaultEvent> {
        self.tx.subscribe()
    }

    /// Endless stream of events for one observer.
    ///
    /// Yields [`VaultEvent::KeepAlive`] after each quiet period. An observer
    /// that falls too far behind skips the missed events and continues.
    pub fn subscribe(&self) -> impl Stream<Item = VaultEvent> + Send + use<> {
        let mut rx = self.tx.subscribe();
        let keep_alive = self.keep_alive;
        async_stream::stream! {
            loop {
                match tokio::time::timeout(keep_alive, rx.recv()).await {
                    Ok(Ok(event)) => yield event,
                    Ok(Err(RecvError::Lagged(missed))) => {
                        tracing::warn!(missed, "event observer lagged");
                    }
                    Ok(Err(RecvError::Closed)) => break,
                    Err(_) => yield VaultEvent::KeepAlive,
                }
            }
        }
    }
}
