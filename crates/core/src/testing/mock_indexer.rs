//! Mock indexer searcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::indexer::{IndexerError, IndexerSearcher, RawSearchHit};

/// Mock implementation of the IndexerSearcher trait.
///
/// Provides controllable behavior for testing:
/// - Per-term canned results plus a default result set
/// - Per-term failure injection
/// - Recorded search terms for assertions
pub struct MockIndexer {
    results_by_term: Arc<RwLock<HashMap<String, Vec<RawSearchHit>>>>,
    default_results: Arc<RwLock<Vec<RawSearchHit>>>,
    failing_terms: Arc<RwLock<HashSet<String>>>,
    searched_terms: Arc<RwLock<Vec<String>>>,
}

impl Default for MockIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIndexer {
    pub fn new() -> Self {
        Self {
            results_by_term: Arc::new(RwLock::new(HashMap::new())),
            default_results: Arc::new(RwLock::new(Vec::new())),
            failing_terms: Arc::new(RwLock::new(HashSet::new())),
            searched_terms: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Canned results for one specific term.
    pub async fn set_results_for(&self, term: &str, hits: Vec<RawSearchHit>) {
        self.results_by_term
            .write()
            .await
            .insert(term.to_string(), hits);
    }

    /// Results returned for any term without canned results.
    pub async fn set_default_results(&self, hits: Vec<RawSearchHit>) {
        *self.default_results.write().await = hits;
    }

    /// Make one term fail with a connection error.
    pub async fn fail_term(&self, term: &str) {
        self.failing_terms.write().await.insert(term.to_string());
    }

    /// Terms searched so far, in order.
    pub async fn searched_terms(&self) -> Vec<String> {
        self.searched_terms.read().await.clone()
    }
}

#[async_trait]
impl IndexerSearcher for MockIndexer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, term: &str, limit: u32) -> Result<Vec<RawSearchHit>, IndexerError> {
        self.searched_terms.write().await.push(term.to_string());

        if self.failing_terms.read().await.contains(term) {
            return Err(IndexerError::ConnectionFailed(format!(
                "mock failure for term '{}'",
                term
            )));
        }

        let mut hits = match self.results_by_term.read().await.get(term) {
            Some(hits) => hits.clone(),
            None => self.default_results.read().await.clone(),
        };
        hits.truncate(limit as usize);
        Ok(hits)
    }
}
