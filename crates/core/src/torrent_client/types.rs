//! Types for torrent client operations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// State of a torrent as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientTorrentState {
    Downloading,
    Seeding,
    Paused,
    Checking,
    Queued,
    Stalled,
    Error,
    Unknown,
}

impl ClientTorrentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientTorrentState::Downloading => "downloading",
            ClientTorrentState::Seeding => "seeding",
            ClientTorrentState::Paused => "paused",
            ClientTorrentState::Checking => "checking",
            ClientTorrentState::Queued => "queued",
            ClientTorrentState::Stalled => "stalled",
            ClientTorrentState::Error => "error",
            ClientTorrentState::Unknown => "unknown",
        }
    }
}

/// A live torrent snapshot from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTorrent {
    /// Info hash (lowercase hex).
    pub hash: String,
    pub name: String,
    pub state: ClientTorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
}

/// Request to add a new torrent by link (magnet URI or .torrent URL).
#[derive(Debug, Clone)]
pub struct AddTorrentRequest {
    pub uri: String,
    pub category: Option<String>,
    pub paused: bool,
}

impl AddTorrentRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            category: None,
            paused: false,
        }
    }

    pub fn with_category(mut self, cat: impl Into<String>) -> Self {
        self.category = Some(cat.into());
        self
    }

    pub fn with_paused(mut self, p: bool) -> Self {
        self.paused = p;
        self
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Add a torrent and wait up to `timeout` for the client to report its
    /// hash. `Ok(None)` means the add was accepted but no hash appeared in
    /// time; the caller treats that as a failed enqueue attempt.
    async fn add_torrent_and_get_hash(
        &self,
        request: AddTorrentRequest,
        timeout: Duration,
    ) -> Result<Option<String>, TorrentClientError>;

    /// List all torrents.
    async fn list_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError>;

    /// Pause a torrent.
    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Resume a paused torrent.
    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Remove a torrent. If `delete_files` is true, also delete downloaded
    /// files.
    async fn remove_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), TorrentClientError>;
}

/// Extract the info hash from a magnet URI, lowercased.
pub fn extract_hash_from_magnet(uri: &str) -> Option<String> {
    let marker = "xt=urn:btih:";
    let start = uri.find(marker)? + marker.len();
    let rest = &uri[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    let hash = &rest[..end];
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_state_as_str() {
        assert_eq!(ClientTorrentState::Downloading.as_str(), "downloading");
        assert_eq!(ClientTorrentState::Stalled.as_str(), "stalled");
    }

    #[test]
    fn test_client_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ClientTorrentState::Seeding).unwrap(),
            "\"seeding\""
        );
    }

    #[test]
    fn test_add_torrent_request_builder() {
        let req = AddTorrentRequest::new("magnet:?xt=urn:btih:abc123")
            .with_category("harvestarr")
            .with_paused(true);

        assert_eq!(req.uri, "magnet:?xt=urn:btih:abc123");
        assert_eq!(req.category.as_deref(), Some("harvestarr"));
        assert!(req.paused);
    }

    #[test]
    fn test_extract_hash_from_magnet() {
        assert_eq!(
            extract_hash_from_magnet("magnet:?xt=urn:btih:ABC123&dn=name").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_hash_from_magnet("magnet:?xt=urn:btih:abc123").as_deref(),
            Some("abc123")
        );
        assert!(extract_hash_from_magnet("http://example.com/file.torrent").is_none());
        assert!(extract_hash_from_magnet("magnet:?xt=urn:btih:").is_none());
    }
}
