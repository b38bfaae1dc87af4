//! Enqueue attempts and bounded retry.
//!
//! One routine performs every enqueue attempt: the initial grab, the
//! periodic retry job and manual single-item retries all go through
//! [`Enqueuer::attempt`]. The persisted attempt counter is the single source
//! of truth, updated atomically by the store, so the retry job and a manual
//! retry can run concurrently without extra locking.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::indexer::TorrentRelease;
use crate::torrent_client::{AddTorrentRequest, TorrentClient};

use super::types::{
    DownloadQueueItem, NewQueueItem, QueueError, QueueStatus, QueueStore, RetryReport,
    SingleRetryOutcome,
};

/// Retry policy knobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after which an `add_failed` item is a permanent failure.
    pub max_attempts: u32,
    /// Minimum time between attempts for one item. Chosen to respect
    /// upstream rate limits.
    pub min_retry_interval: Duration,
    /// Bounded wait for the client to report a hash per attempt.
    pub add_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_retry_interval: Duration::from_secs(5 * 60),
            add_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared enqueue routine over the store and the download client.
pub struct Enqueuer {
    store: Arc<dyn QueueStore>,
    client: Arc<dyn TorrentClient>,
    policy: RetryPolicy,
}

impl Enqueuer {
    pub fn new(
        store: Arc<dyn QueueStore>,
        client: Arc<dyn TorrentClient>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            client,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Create a queue item for a selected release and run the first enqueue
    /// attempt immediately.
    pub async fn enqueue_release(
        &self,
        scene_id: Option<i64>,
        release: &TorrentRelease,
    ) -> Result<DownloadQueueItem, QueueError> {
        let item = self.store.insert(NewQueueItem {
            scene_id,
            torrent_hash: release.info_hash.clone(),
            title: release.title.clone(),
            size_bytes: release.size_bytes,
            seeders: release.seeders,
            quality: release.quality.clone(),
            download_url: release.download_url.clone(),
        })?;

        self.attempt(&item).await?;

        // Re-read: the attempt mutated status/attempts/hash.
        self.store
            .get(&item.id)?
            .ok_or_else(|| QueueError::NotFound(item.id.clone()))
    }

    /// Best-effort download link for an item, reconstructing a magnet URI
    /// from the stored info hash when the original link was not retained.
    fn download_link(item: &DownloadQueueItem) -> Option<String> {
        if let Some(url) = &item.download_url {
            return Some(url.clone());
        }
        item.torrent_hash.as_ref().map(|hash| {
            format!(
                "magnet:?xt=urn:btih:{}&dn={}",
                hash,
                urlencoding::encode(&item.title)
            )
        })
    }

    /// One enqueue attempt. Increments the attempt counter, calls the
    /// client with a bounded wait, and records the outcome as item state.
    /// Client failures never propagate; they become `add_failed`.
    pub async fn attempt(&self, item: &DownloadQueueItem) -> Result<bool, QueueError> {
        let attempts = self.store.begin_attempt(&item.id)?;

        let Some(uri) = Self::download_link(item) else {
            warn!(id = %item.id, "No download link or info hash to enqueue");
            self.store
                .finish_attempt_failure(&item.id, "no download link or info hash")?;
            return Ok(false);
        };

        debug!(id = %item.id, attempts, "Enqueue attempt");

        let request = AddTorrentRequest::new(uri).with_category("harvestarr");
        match self
            .client
            .add_torrent_and_get_hash(request, self.policy.add_timeout)
            .await
        {
            Ok(Some(hash)) => {
                info!(id = %item.id, hash = %hash, "Enqueued torrent");
                self.store.finish_attempt_success(&item.id, &hash)?;
                Ok(true)
            }
            Ok(None) => {
                warn!(id = %item.id, "Client reported no hash within wait window");
                self.store.finish_attempt_failure(
                    &item.id,
                    "client did not report a hash within the wait window",
                )?;
                Ok(false)
            }
            Err(e) => {
                warn!(id = %item.id, error = %e, "Enqueue attempt failed");
                self.store.finish_attempt_failure(&item.id, &e.to_string())?;
                Ok(false)
            }
        }
    }

    /// Retry job: re-attempt `add_failed` items that are under the attempt
    /// cap and outside the minimum retry interval. Items at the cap are
    /// counted as permanent failures and left in place.
    pub async fn retry_failed(&self, max_attempts: u32) -> Result<RetryReport, QueueError> {
        let failed = self.store.list_by_status(QueueStatus::AddFailed)?;
        let mut report = RetryReport {
            total: failed.len(),
            ..Default::default()
        };

        let now = Utc::now();
        for item in failed {
            if item.attempts >= max_attempts {
                report.permanent_failures += 1;
                continue;
            }

            if let Some(last) = item.last_attempt {
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                if elapsed < self.policy.min_retry_interval {
                    debug!(id = %item.id, "Skipping retry inside minimum interval");
                    continue;
                }
            }

            if self.attempt(&item).await? {
                report.succeeded += 1;
            }
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            permanent = report.permanent_failures,
            "Retry job finished"
        );

        Ok(report)
    }

    /// Manual single-item retry. Shares the enqueue routine with the retry
    /// job but skips the interval gate; the attempt cap still applies.
    pub async fn retry_single(&self, id: &str) -> Result<SingleRetryOutcome, QueueError> {
        let item = self
            .store
            .get(id)?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        if item.is_permanent_failure(self.policy.max_attempts) {
            return Ok(SingleRetryOutcome {
                id: id.to_string(),
                success: false,
                status: item.status,
            });
        }

        let success = self.attempt(&item).await?;
        let status = self
            .store
            .get(id)?
            .map(|i| i.status)
            .unwrap_or(QueueStatus::AddFailed);

        Ok(SingleRetryOutcome {
            id: id.to_string(),
            success,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SqliteQueueStore;
    use crate::testing::MockTorrentClient;
    use crate::torrent_client::TorrentClientError;

    fn make_release(title: &str, hash: Option<&str>) -> TorrentRelease {
        TorrentRelease {
            title: title.to_string(),
            info_hash: hash.map(str::to_string),
            size_bytes: 1024,
            seeders: 5,
            leechers: 0,
            quality: Some("1080p".to_string()),
            source: None,
            download_url: hash.map(|h| format!("magnet:?xt=urn:btih:{}", h)),
            sources: vec![],
        }
    }

    fn harness() -> (Arc<SqliteQueueStore>, Arc<MockTorrentClient>, Enqueuer) {
        let store = Arc::new(SqliteQueueStore::in_memory().unwrap());
        let client = Arc::new(MockTorrentClient::new());
        let enqueuer = Enqueuer::new(
            store.clone(),
            client.clone(),
            RetryPolicy {
                max_attempts: 5,
                min_retry_interval: Duration::from_secs(300),
                add_timeout: Duration::from_secs(1),
            },
        );
        (store, client, enqueuer)
    }

    #[tokio::test]
    async fn test_enqueue_release_success() {
        let (_store, client, enqueuer) = harness();

        let item = enqueuer
            .enqueue_release(Some(3), &make_release("Test", Some("abc123")))
            .await
            .unwrap();

        assert_eq!(item.status, QueueStatus::Downloading);
        assert_eq!(item.attempts, 1);
        assert!(item.client_hash.is_some());
        assert!(item.last_error.is_none());
        assert_eq!(client.added().await.len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_failure_recorded_not_thrown() {
        let (_store, client, enqueuer) = harness();
        client
            .push_add_result(Err(TorrentClientError::ConnectionFailed("down".to_string())))
            .await;

        let item = enqueuer
            .enqueue_release(None, &make_release("Test", Some("abc123")))
            .await
            .unwrap();

        assert_eq!(item.status, QueueStatus::AddFailed);
        assert_eq!(item.attempts, 1);
        assert!(item.last_error.as_deref().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_missing_hash_within_wait_is_add_failed() {
        let (_store, client, enqueuer) = harness();
        client.push_add_result(Ok(None)).await;

        let item = enqueuer
            .enqueue_release(None, &make_release("Test", Some("abc123")))
            .await
            .unwrap();

        assert_eq!(item.status, QueueStatus::AddFailed);
        assert!(item
            .last_error
            .as_deref()
            .unwrap()
            .contains("wait window"));
    }

    #[tokio::test]
    async fn test_magnet_reconstruction_when_link_missing() {
        let (store, client, enqueuer) = harness();

        // Item with an info hash but no retained link.
        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: Some("cafebabe".to_string()),
                title: "Lost Link".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();

        enqueuer.attempt(&item).await.unwrap();

        let added = client.added().await;
        assert_eq!(added.len(), 1);
        assert!(added[0].uri.starts_with("magnet:?xt=urn:btih:cafebabe"));
        assert!(added[0].uri.contains("Lost%20Link"));
    }

    #[tokio::test]
    async fn test_no_link_no_hash_fails_without_client_call() {
        let (store, client, enqueuer) = harness();

        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: None,
                title: "Nothing".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();

        let ok = enqueuer.attempt(&item).await.unwrap();
        assert!(!ok);
        assert!(client.added().await.is_empty());

        let fetched = store.get(&item.id).unwrap().unwrap();
        assert_eq!(fetched.status, QueueStatus::AddFailed);
        assert_eq!(fetched.attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_failed_excludes_capped_items() {
        let (store, _client, enqueuer) = harness();

        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: Some("abc".to_string()),
                title: "Capped".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();
        for _ in 0..5 {
            store.begin_attempt(&item.id).unwrap();
        }
        store.finish_attempt_failure(&item.id, "err").unwrap();

        let report = enqueuer.retry_failed(5).await.unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.permanent_failures, 1);

        // Still in place, never auto-deleted.
        assert!(store.get(&item.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_retry_failed_skips_recent_attempts() {
        let (store, client, enqueuer) = harness();

        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: Some("abc".to_string()),
                title: "Recent".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();
        // Attempt just happened (last_attempt = now).
        store.begin_attempt(&item.id).unwrap();
        store.finish_attempt_failure(&item.id, "err").unwrap();

        let report = enqueuer.retry_failed(5).await.unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.permanent_failures, 0);
        // No client call was made for the recent item.
        assert!(client.added().await.is_empty());
    }

    #[tokio::test]
    async fn test_retry_single_succeeds_from_add_failed() {
        let (store, _client, enqueuer) = harness();

        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: Some("abc".to_string()),
                title: "Retry Me".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();
        store.begin_attempt(&item.id).unwrap();
        store.finish_attempt_failure(&item.id, "err").unwrap();

        let outcome = enqueuer.retry_single(&item.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.status, QueueStatus::Downloading);
    }

    #[tokio::test]
    async fn test_retry_single_permanent_failure_is_noop() {
        let (store, client, enqueuer) = harness();

        let item = store
            .insert(NewQueueItem {
                scene_id: None,
                torrent_hash: Some("abc".to_string()),
                title: "Done".to_string(),
                size_bytes: 1,
                seeders: 1,
                quality: None,
                download_url: None,
            })
            .unwrap();
        for _ in 0..5 {
            store.begin_attempt(&item.id).unwrap();
        }
        store.finish_attempt_failure(&item.id, "err").unwrap();

        let outcome = enqueuer.retry_single(&item.id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, QueueStatus::AddFailed);
        assert!(client.added().await.is_empty());
    }

    #[tokio::test]
    async fn test_retry_single_missing_item_errors() {
        let (_store, _client, enqueuer) = harness();
        assert!(matches!(
            enqueuer.retry_single("missing").await,
            Err(QueueError::NotFound(_))
        ));
    }
}
