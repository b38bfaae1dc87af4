//! Types for the release search system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw result from a single indexer (before deduplication).
#[derive(Debug, Clone)]
pub struct RawSearchHit {
    pub title: String,
    /// Stable identifier of the indexer that returned this hit.
    pub indexer_id: String,
    /// Human-readable indexer name.
    pub indexer: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    /// Quality tag parsed from the title (e.g. "1080p").
    pub quality: Option<String>,
    /// Source tag parsed from the title (e.g. "WEB-DL").
    pub source: Option<String>,
    pub download_url: Option<String>,
    pub magnet_uri: Option<String>,
    /// Info hash (hex) if the indexer reported one.
    pub info_hash: Option<String>,
}

impl RawSearchHit {
    /// Best available download link, preferring magnet URIs.
    pub fn best_link(&self) -> Option<&str> {
        self.magnet_uri.as_deref().or(self.download_url.as_deref())
    }
}

/// A single indexer's listing for a deduplicated release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSource {
    pub indexer_id: String,
    pub indexer: String,
    pub seeders: u32,
    pub leechers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// A release after cross-indexer deduplication.
///
/// Top-level seeders/leechers/download_url always reflect the
/// highest-seeder contributing source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentRelease {
    pub title: String,
    /// Info hash (lowercase hex), if any contributing indexer reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// All indexers that listed this release.
    pub sources: Vec<ReleaseSource>,
}

impl TorrentRelease {
    /// Number of distinct indexers that listed this release.
    pub fn indexer_count(&self) -> usize {
        let mut names: Vec<&str> = self.sources.iter().map(|s| s.indexer.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    /// Names of the indexers that listed this release, in merge order.
    pub fn indexer_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.indexer.as_str()).collect()
    }

    /// Distinct indexer ids contributing this release.
    pub fn distinct_indexer_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.iter().map(|s| s.indexer_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Errors that can occur during indexer search operations.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Search broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search broker API error: {0}")]
    ApiError(String),

    #[error("All indexers failed")]
    AllIndexersFailed,

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for release search brokers (Jackett, Prowlarr, ...).
///
/// One `search` call covers one search term; the pipeline issues terms
/// sequentially and tolerates per-term failures.
#[async_trait]
pub trait IndexerSearcher: Send + Sync {
    /// Broker name for logging.
    fn name(&self) -> &str;

    /// Search all enabled indexers for a single term.
    async fn search(&self, term: &str, limit: u32) -> Result<Vec<RawSearchHit>, IndexerError>;
}
