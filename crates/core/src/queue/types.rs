//! Download queue data types and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a download queue item.
///
/// Transitions follow a fixed machine:
/// `queued → downloading → {seeding, completed}`, `queued/downloading ↔
/// paused`, any failed enqueue → `add_failed`, and a successful retry from
/// `add_failed` → `downloading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Downloading,
    Seeding,
    Completed,
    Paused,
    AddFailed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Downloading => "downloading",
            QueueStatus::Seeding => "seeding",
            QueueStatus::Completed => "completed",
            QueueStatus::Paused => "paused",
            QueueStatus::AddFailed => "add_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(QueueStatus::Queued),
            "downloading" => Some(QueueStatus::Downloading),
            "seeding" => Some(QueueStatus::Seeding),
            "completed" => Some(QueueStatus::Completed),
            "paused" => Some(QueueStatus::Paused),
            "add_failed" => Some(QueueStatus::AddFailed),
            _ => None,
        }
    }

    /// Whether `self → to` is a legal transition. Self-transitions are
    /// always allowed (status refreshes are idempotent).
    pub fn can_transition_to(&self, to: QueueStatus) -> bool {
        if *self == to {
            return true;
        }
        matches!(
            (*self, to),
            (QueueStatus::Queued, QueueStatus::Downloading)
                | (QueueStatus::Queued, QueueStatus::Paused)
                | (QueueStatus::Queued, QueueStatus::AddFailed)
                | (QueueStatus::Downloading, QueueStatus::Seeding)
                | (QueueStatus::Downloading, QueueStatus::Completed)
                | (QueueStatus::Downloading, QueueStatus::Paused)
                | (QueueStatus::Paused, QueueStatus::Queued)
                | (QueueStatus::Paused, QueueStatus::Downloading)
                | (QueueStatus::AddFailed, QueueStatus::Downloading)
                | (QueueStatus::Seeding, QueueStatus::Completed)
        )
    }
}

/// A persisted download queue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadQueueItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<i64>,
    /// Info hash from the indexer, if known at enqueue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_hash: Option<String>,
    /// Hash assigned by the download client on a successful add.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_hash: Option<String>,
    pub title: String,
    pub size_bytes: u64,
    pub seeders: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Original download link, if retained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub status: QueueStatus,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DownloadQueueItem {
    /// Whether this item has exhausted its retries.
    pub fn is_permanent_failure(&self, max_attempts: u32) -> bool {
        self.status == QueueStatus::AddFailed && self.attempts >= max_attempts
    }

    /// Hash to match against the live client snapshot.
    pub fn effective_hash(&self) -> Option<String> {
        self.client_hash
            .as_deref()
            .or(self.torrent_hash.as_deref())
            .map(|h| h.to_lowercase())
    }
}

/// Request to create a new queue item.
#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub scene_id: Option<i64>,
    pub torrent_hash: Option<String>,
    pub title: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub quality: Option<String>,
    pub download_url: Option<String>,
}

/// Aggregate queue counts by status, plus permanent failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub downloading: usize,
    pub seeding: usize,
    pub completed: usize,
    pub paused: usize,
    pub add_failed: usize,
    /// `add_failed` items at or past the attempt cap.
    pub permanent_failures: usize,
}

/// Result of one retry-job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub total: usize,
    pub succeeded: usize,
    pub permanent_failures: usize,
    /// Set when the retry machinery is not configured; counts are zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_configured: Option<String>,
}

impl RetryReport {
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self {
            not_configured: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Result of a manual single-item retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRetryOutcome {
    pub id: String,
    pub success: bool,
    pub status: QueueStatus,
}

/// Errors that can occur in queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue item not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: QueueStatus, to: QueueStatus },
}

/// Persistence seam for the download queue.
pub trait QueueStore: Send + Sync {
    fn insert(&self, item: NewQueueItem) -> Result<DownloadQueueItem, QueueError>;

    fn get(&self, id: &str) -> Result<Option<DownloadQueueItem>, QueueError>;

    fn list(&self) -> Result<Vec<DownloadQueueItem>, QueueError>;

    fn list_by_status(&self, status: QueueStatus) -> Result<Vec<DownloadQueueItem>, QueueError>;

    /// Validated status update; completed items get `completed_at` stamped.
    fn update_status(&self, id: &str, status: QueueStatus) -> Result<(), QueueError>;

    /// Atomically increment the attempt counter and stamp `last_attempt`.
    /// Returns the new attempt count. This is the single source of truth the
    /// retry job and manual retry both rely on.
    fn begin_attempt(&self, id: &str) -> Result<u32, QueueError>;

    /// Record a successful enqueue: store the client hash, clear the error,
    /// move to `downloading`.
    fn finish_attempt_success(&self, id: &str, client_hash: &str) -> Result<(), QueueError>;

    /// Record a failed enqueue: store the error, move to `add_failed`.
    fn finish_attempt_failure(&self, id: &str, error: &str) -> Result<(), QueueError>;

    fn delete(&self, id: &str) -> Result<(), QueueError>;

    fn counts(&self, max_attempts: u32) -> Result<QueueCounts, QueueError>;
}
