//! Reconciliation of persisted queue status with the live client snapshot.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::torrent_client::{ClientTorrent, ClientTorrentState, TorrentClient};

use super::types::{DownloadQueueItem, QueueError, QueueStatus, QueueStore};

/// Merge one item's persisted status with its live client state.
///
/// Precedence: paused client states win; checking/queued/stalled coalesce to
/// the nearest of {downloading, seeding}; progress at 100% with no stronger
/// signal resolves to completed; no live snapshot keeps the persisted status.
pub fn reconcile_status(persisted: QueueStatus, live: Option<&ClientTorrent>) -> QueueStatus {
    let Some(live) = live else {
        return persisted;
    };

    match live.state {
        ClientTorrentState::Paused => QueueStatus::Paused,
        ClientTorrentState::Downloading => QueueStatus::Downloading,
        ClientTorrentState::Seeding => QueueStatus::Seeding,
        ClientTorrentState::Checking | ClientTorrentState::Queued | ClientTorrentState::Stalled => {
            if live.progress >= 1.0 {
                QueueStatus::Seeding
            } else {
                QueueStatus::Downloading
            }
        }
        ClientTorrentState::Error | ClientTorrentState::Unknown => {
            if live.progress >= 1.0 {
                QueueStatus::Completed
            } else {
                persisted
            }
        }
    }
}

/// Merges persisted queue state with the live client snapshot.
pub struct StatusReconciler {
    store: Arc<dyn QueueStore>,
    client: Arc<dyn TorrentClient>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn QueueStore>, client: Arc<dyn TorrentClient>) -> Self {
        Self { store, client }
    }

    /// Reconcile every queue item against the client and persist changed
    /// statuses. Returns the refreshed items.
    ///
    /// A failed snapshot fetch degrades to the persisted view.
    pub async fn reconcile(&self) -> Result<Vec<DownloadQueueItem>, QueueError> {
        let items = self.store.list()?;

        let snapshot = match self.client.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(error = %e, "Client snapshot unavailable, keeping persisted statuses");
                return Ok(items);
            }
        };

        let by_hash: std::collections::HashMap<String, &ClientTorrent> = snapshot
            .iter()
            .map(|t| (t.hash.to_lowercase(), t))
            .collect();

        let mut refreshed = Vec::with_capacity(items.len());
        for item in items {
            let live = item
                .effective_hash()
                .and_then(|h| by_hash.get(&h).copied());
            let merged = reconcile_status(item.status, live);

            if merged != item.status {
                if item.status.can_transition_to(merged) {
                    debug!(
                        id = %item.id,
                        from = item.status.as_str(),
                        to = merged.as_str(),
                        "Reconciled queue status"
                    );
                    self.store.update_status(&item.id, merged)?;
                } else {
                    // The client disagrees with the recorded lifecycle;
                    // keep the persisted status and surface the conflict.
                    warn!(
                        id = %item.id,
                        persisted = item.status.as_str(),
                        live = merged.as_str(),
                        "Client state conflicts with queue state machine"
                    );
                }
            }

            match self.store.get(&item.id)? {
                Some(updated) => refreshed.push(updated),
                None => refreshed.push(item),
            }
        }

        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(state: ClientTorrentState, progress: f64) -> ClientTorrent {
        ClientTorrent {
            hash: "abc".to_string(),
            name: "Test".to_string(),
            state,
            progress,
        }
    }

    #[test]
    fn test_no_snapshot_keeps_persisted() {
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, None),
            QueueStatus::Downloading
        );
        assert_eq!(
            reconcile_status(QueueStatus::AddFailed, None),
            QueueStatus::AddFailed
        );
    }

    #[test]
    fn test_paused_wins() {
        let t = live(ClientTorrentState::Paused, 1.0);
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, Some(&t)),
            QueueStatus::Paused
        );
    }

    #[test]
    fn test_transitional_states_coalesce_by_progress() {
        let checking = live(ClientTorrentState::Checking, 0.4);
        assert_eq!(
            reconcile_status(QueueStatus::Queued, Some(&checking)),
            QueueStatus::Downloading
        );

        let stalled_done = live(ClientTorrentState::Stalled, 1.0);
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, Some(&stalled_done)),
            QueueStatus::Seeding
        );

        let queued = live(ClientTorrentState::Queued, 0.0);
        assert_eq!(
            reconcile_status(QueueStatus::Queued, Some(&queued)),
            QueueStatus::Downloading
        );
    }

    #[test]
    fn test_full_progress_without_stronger_signal_is_completed() {
        let unknown_done = live(ClientTorrentState::Unknown, 1.0);
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, Some(&unknown_done)),
            QueueStatus::Completed
        );

        // A live downloading state is a stronger signal than bare progress.
        let downloading = live(ClientTorrentState::Downloading, 1.0);
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, Some(&downloading)),
            QueueStatus::Downloading
        );
    }

    #[test]
    fn test_unknown_without_progress_keeps_persisted() {
        let unknown = live(ClientTorrentState::Unknown, 0.2);
        assert_eq!(
            reconcile_status(QueueStatus::Downloading, Some(&unknown)),
            QueueStatus::Downloading
        );
    }
}
