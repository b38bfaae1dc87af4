//! Mock torrent client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentRequest, ClientTorrent, ClientTorrentState, TorrentClient, TorrentClientError,
};

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Scripted add outcomes (`push_add_result`); by default every add
///   succeeds with a generated hash
/// - Settable live torrent snapshot for reconciliation tests
/// - Recorded add/pause/resume/remove calls for assertions
pub struct MockTorrentClient {
    added: Arc<RwLock<Vec<AddTorrentRequest>>>,
    scripted_adds: Arc<RwLock<VecDeque<Result<Option<String>, TorrentClientError>>>>,
    torrents: Arc<RwLock<HashMap<String, ClientTorrent>>>,
    paused: Arc<RwLock<Vec<String>>>,
    resumed: Arc<RwLock<Vec<String>>>,
    removed: Arc<RwLock<Vec<String>>>,
    hash_counter: Arc<RwLock<u32>>,
    list_fails: Arc<RwLock<bool>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            added: Arc::new(RwLock::new(Vec::new())),
            scripted_adds: Arc::new(RwLock::new(VecDeque::new())),
            torrents: Arc::new(RwLock::new(HashMap::new())),
            paused: Arc::new(RwLock::new(Vec::new())),
            resumed: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            hash_counter: Arc::new(RwLock::new(0)),
            list_fails: Arc::new(RwLock::new(false)),
        }
    }

    /// Queue the outcome of the next add call.
    pub async fn push_add_result(&self, result: Result<Option<String>, TorrentClientError>) {
        self.scripted_adds.write().await.push_back(result);
    }

    /// Recorded add requests.
    pub async fn added(&self) -> Vec<AddTorrentRequest> {
        self.added.read().await.clone()
    }

    /// Set a live torrent visible to `list_torrents`.
    pub async fn set_torrent(&self, hash: &str, state: ClientTorrentState, progress: f64) {
        self.torrents.write().await.insert(
            hash.to_lowercase(),
            ClientTorrent {
                hash: hash.to_lowercase(),
                name: format!("torrent-{}", hash),
                state,
                progress,
            },
        );
    }

    /// Make `list_torrents` fail until reset.
    pub async fn set_list_fails(&self, fails: bool) {
        *self.list_fails.write().await = fails;
    }

    pub async fn paused_hashes(&self) -> Vec<String> {
        self.paused.read().await.clone()
    }

    pub async fn removed_hashes(&self) -> Vec<String> {
        self.removed.read().await.clone()
    }

    async fn next_hash(&self) -> String {
        let mut counter = self.hash_counter.write().await;
        *counter += 1;
        format!("mockhash{:08x}", *counter)
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_torrent_and_get_hash(
        &self,
        request: AddTorrentRequest,
        _timeout: Duration,
    ) -> Result<Option<String>, TorrentClientError> {
        self.added.write().await.push(request);

        if let Some(scripted) = self.scripted_adds.write().await.pop_front() {
            if let Ok(Some(hash)) = &scripted {
                self.set_torrent(hash, ClientTorrentState::Downloading, 0.0).await;
            }
            return scripted;
        }

        let hash = self.next_hash().await;
        self.set_torrent(&hash, ClientTorrentState::Downloading, 0.0).await;
        Ok(Some(hash))
    }

    async fn list_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        if *self.list_fails.read().await {
            return Err(TorrentClientError::ConnectionFailed(
                "mock list failure".to_string(),
            ));
        }
        let mut torrents: Vec<ClientTorrent> =
            self.torrents.read().await.values().cloned().collect();
        torrents.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(torrents)
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.paused.write().await.push(hash.to_lowercase());
        if let Some(t) = self.torrents.write().await.get_mut(&hash.to_lowercase()) {
            t.state = ClientTorrentState::Paused;
        }
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.resumed.write().await.push(hash.to_lowercase());
        if let Some(t) = self.torrents.write().await.get_mut(&hash.to_lowercase()) {
            t.state = ClientTorrentState::Downloading;
        }
        Ok(())
    }

    async fn remove_torrent(
        &self,
        hash: &str,
        _delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.removed.write().await.push(hash.to_lowercase());
        self.torrents.write().await.remove(&hash.to_lowercase());
        Ok(())
    }
}
