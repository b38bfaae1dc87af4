//! Mock neural ranker for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::matching::{NeuralRanker, RankedMatch, RankerError};

/// Mock implementation of the NeuralRanker trait.
///
/// Default scoring: 1.0 for case-insensitive equality, 0.0 otherwise;
/// specific `(query, candidate)` pairs can be overridden with `set_score`.
/// Tracks initialize/unload calls so tests can assert the load-once /
/// unload-once bracket.
pub struct MockRanker {
    initialize_count: AtomicU32,
    unload_count: AtomicU32,
    loaded: AtomicBool,
    fail_initialize: AtomicBool,
    fail_scoring: AtomicBool,
    overrides: Arc<Mutex<Vec<(String, String, f32)>>>,
}

impl Default for MockRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRanker {
    pub fn new() -> Self {
        Self {
            initialize_count: AtomicU32::new(0),
            unload_count: AtomicU32::new(0),
            loaded: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
            fail_scoring: AtomicBool::new(false),
            overrides: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn initialize_count(&self) -> u32 {
        self.initialize_count.load(Ordering::SeqCst)
    }

    pub fn unload_count(&self) -> u32 {
        self.unload_count.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scoring(&self, fail: bool) {
        self.fail_scoring.store(fail, Ordering::SeqCst);
    }

    /// Override the score for one `(query, candidate)` pair, compared
    /// case-insensitively.
    pub fn set_score(&self, query: &str, candidate: &str, score: f32) {
        self.overrides.lock().unwrap().push((
            query.to_lowercase(),
            candidate.to_lowercase(),
            score,
        ));
    }

    fn score_pair(&self, query: &str, candidate: &str) -> f32 {
        let query = query.to_lowercase();
        let candidate = candidate.to_lowercase();

        for (q, c, score) in self.overrides.lock().unwrap().iter() {
            if *q == query && *c == candidate {
                return *score;
            }
        }

        if query == candidate {
            1.0
        } else {
            0.0
        }
    }
}

#[async_trait]
impl NeuralRanker for MockRanker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<(), RankerError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(RankerError::InitFailed("mock init failure".to_string()));
        }
        self.initialize_count.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unload(&self) -> Result<(), RankerError> {
        self.unload_count.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn find_best_match(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f32,
    ) -> Result<Option<RankedMatch>, RankerError> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(RankerError::NotLoaded);
        }
        if self.fail_scoring.load(Ordering::SeqCst) {
            return Err(RankerError::ScoringFailed("mock scoring failure".to_string()));
        }

        let mut best: Option<RankedMatch> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let score = self.score_pair(query, candidate);
            if score < threshold {
                continue;
            }
            if best.map(|b| score > b.score).unwrap_or(true) {
                best = Some(RankedMatch { index, score });
            }
        }

        Ok(best)
    }
}
