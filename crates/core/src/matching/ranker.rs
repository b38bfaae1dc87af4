//! Reference-counted access to the shared neural ranker.
//!
//! The cross-encoder model is one global resource. Each matching batch holds
//! a lease for its whole duration: the model loads when the first lease is
//! taken and unloads when the last one is released, so a concurrent
//! invocation can never unload it mid-use by another.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{NeuralRanker, RankedMatch, RankerError};

/// Shared, reference-counted handle over a [`NeuralRanker`].
#[derive(Clone)]
pub struct SharedRanker {
    inner: Arc<dyn NeuralRanker>,
    leases: Arc<Mutex<u32>>,
}

/// An active lease on the shared ranker.
///
/// Must be released with [`RankerLease::release`]; the model stays loaded
/// while any lease is outstanding.
pub struct RankerLease {
    ranker: SharedRanker,
    released: bool,
}

impl SharedRanker {
    pub fn new(inner: Arc<dyn NeuralRanker>) -> Self {
        Self {
            inner,
            leases: Arc::new(Mutex::new(0)),
        }
    }

    /// Take a lease, initializing the model on the first one.
    pub async fn acquire(&self) -> Result<RankerLease, RankerError> {
        let mut leases = self.leases.lock().await;
        if *leases == 0 {
            debug!(ranker = self.inner.name(), "Initializing ranker model");
            self.inner.initialize().await?;
        }
        *leases += 1;
        Ok(RankerLease {
            ranker: self.clone(),
            released: false,
        })
    }

    /// Number of outstanding leases.
    pub async fn lease_count(&self) -> u32 {
        *self.leases.lock().await
    }

    async fn release_one(&self) {
        let mut leases = self.leases.lock().await;
        debug_assert!(*leases > 0, "ranker lease released twice");
        *leases = leases.saturating_sub(1);
        if *leases == 0 {
            debug!(ranker = self.inner.name(), "Unloading ranker model");
            if let Err(e) = self.inner.unload().await {
                warn!(error = %e, "Ranker unload failed");
            }
        }
    }
}

impl RankerLease {
    /// Score through the leased model.
    pub async fn find_best_match(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f32,
    ) -> Result<Option<RankedMatch>, RankerError> {
        self.ranker.inner.find_best_match(query, candidates, threshold).await
    }

    /// Release the lease, unloading the model if this was the last one.
    pub async fn release(mut self) {
        self.released = true;
        self.ranker.release_one().await;
    }
}

impl Drop for RankerLease {
    fn drop(&mut self) {
        if !self.released {
            // Cannot unload from a sync Drop; the count stays high and the
            // model stays loaded. Surface the leak loudly.
            warn!("Ranker lease dropped without release; model left loaded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRanker;

    #[tokio::test]
    async fn test_acquire_initializes_once() {
        let mock = Arc::new(MockRanker::new());
        let shared = SharedRanker::new(mock.clone());

        let a = shared.acquire().await.unwrap();
        let b = shared.acquire().await.unwrap();

        assert_eq!(mock.initialize_count(), 1);
        assert_eq!(shared.lease_count().await, 2);

        a.release().await;
        assert_eq!(mock.unload_count(), 0);

        b.release().await;
        assert_eq!(mock.unload_count(), 1);
        assert_eq!(shared.lease_count().await, 0);
    }

    #[tokio::test]
    async fn test_reacquire_after_full_release_reinitializes() {
        let mock = Arc::new(MockRanker::new());
        let shared = SharedRanker::new(mock.clone());

        let a = shared.acquire().await.unwrap();
        a.release().await;

        let b = shared.acquire().await.unwrap();
        b.release().await;

        assert_eq!(mock.initialize_count(), 2);
        assert_eq!(mock.unload_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_initialize_takes_no_lease() {
        let mock = Arc::new(MockRanker::new());
        mock.fail_initialize(true);
        let shared = SharedRanker::new(mock.clone());

        assert!(shared.acquire().await.is_err());
        assert_eq!(shared.lease_count().await, 0);
    }
}
