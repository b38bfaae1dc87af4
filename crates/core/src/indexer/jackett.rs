//! Jackett search broker implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::JackettConfig;

use super::parse::{parse_quality, parse_source};
use super::{IndexerError, IndexerSearcher, RawSearchHit};

/// Jackett search broker implementation.
///
/// Fans out one search term to all enabled indexers concurrently; per-indexer
/// failures are logged and the remaining results returned.
pub struct JackettSearcher {
    client: Client,
    config: JackettConfig,
}

impl JackettSearcher {
    /// Create a new JackettSearcher with the given configuration.
    pub fn new(config: JackettConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Build the Jackett API URL for a search against one indexer.
    fn build_search_url(&self, term: &str, indexer: &str) -> String {
        format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(indexer),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(term)
        )
    }

    /// Search a single indexer.
    async fn search_indexer(
        &self,
        term: &str,
        indexer: &str,
    ) -> Result<Vec<RawSearchHit>, IndexerError> {
        let url = self.build_search_url(term, indexer);
        debug!(indexer = indexer, term = term, "Searching Jackett");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                IndexerError::Timeout
            } else if e.is_connect() {
                IndexerError::ConnectionFailed(e.to_string())
            } else {
                IndexerError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::ApiError(format!("Failed to parse response: {}", e)))?;

        debug!(
            indexer = indexer,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        Ok(jackett_response
            .Results
            .into_iter()
            .map(|r| {
                let quality = parse_quality(&r.Title);
                let source = parse_source(&r.Title);
                RawSearchHit {
                    indexer_id: r.TrackerId.unwrap_or_else(|| indexer.to_string()),
                    indexer: r.Tracker.unwrap_or_else(|| indexer.to_string()),
                    magnet_uri: r.MagnetUri,
                    download_url: r.Link,
                    info_hash: r.InfoHash.map(|h| h.to_lowercase()),
                    size_bytes: r.Size.unwrap_or(0).max(0) as u64,
                    seeders: r.Seeders.unwrap_or(0).max(0) as u32,
                    leechers: r
                        .Peers
                        .unwrap_or(0)
                        .saturating_sub(r.Seeders.unwrap_or(0))
                        .max(0) as u32,
                    quality,
                    source,
                    title: r.Title,
                }
            })
            .collect())
    }
}

#[async_trait]
impl IndexerSearcher for JackettSearcher {
    fn name(&self) -> &str {
        "jackett"
    }

    async fn search(&self, term: &str, limit: u32) -> Result<Vec<RawSearchHit>, IndexerError> {
        let indexers: Vec<&str> = self
            .config
            .indexers
            .iter()
            .filter(|i| i.enabled)
            .map(|i| i.name.as_str())
            .collect();

        if indexers.is_empty() {
            return Err(IndexerError::AllIndexersFailed);
        }

        // All indexers concurrently, but still one term per call.
        let search_futures: Vec<_> = indexers
            .iter()
            .map(|indexer| async move {
                let result = self.search_indexer(term, indexer).await;
                (*indexer, result)
            })
            .collect();

        let results = futures::future::join_all(search_futures).await;

        let mut hits: Vec<RawSearchHit> = Vec::new();
        let mut failures = 0usize;

        for (indexer, result) in &results {
            match result {
                Ok(indexer_hits) => hits.extend(indexer_hits.iter().cloned()),
                Err(e) => {
                    warn!(indexer = %indexer, error = %e, "Indexer search failed");
                    failures += 1;
                }
            }
        }

        if hits.is_empty() && failures == results.len() {
            return Err(IndexerError::AllIndexersFailed);
        }

        hits.truncate(limit as usize);
        Ok(hits)
    }
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    Tracker: Option<String>,
    TrackerId: Option<String>,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
}
