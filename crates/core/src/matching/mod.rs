//! Group-to-scene matching.
//!
//! Two interchangeable strategies behind the `MatchEngine` trait: lexical
//! string similarity and a neural cross-encoder. Both are greedy and
//! first-group-wins; a scene is claimed at most once per run.

mod lexical;
mod neural;
mod ranker;
mod types;

use std::sync::Arc;

use crate::config::{MatchStrategy, MatchingConfig};

pub use lexical::{LexicalMatcher, NormalizedLevenshtein, SimilarityScorer};
pub use neural::{NeuralMatcher, MIN_TITLE_LEN_RATIO};
pub use ranker::{RankerLease, SharedRanker};
pub use types::*;

/// Build the configured match engine.
///
/// Falls back to the lexical strategy when the neural strategy is requested
/// without a ranker backend.
pub fn create_match_engine(
    config: &MatchingConfig,
    ranker: Option<Arc<dyn NeuralRanker>>,
) -> Arc<dyn MatchEngine> {
    match (config.strategy, ranker) {
        (MatchStrategy::Neural, Some(ranker)) => Arc::new(NeuralMatcher::new(
            SharedRanker::new(ranker),
            config.neural_threshold,
        )),
        (MatchStrategy::Neural, None) => {
            tracing::warn!("Neural matching configured without a ranker, using lexical");
            Arc::new(LexicalMatcher::with_scorer(
                Box::new(NormalizedLevenshtein),
                config.lexical_threshold,
            ))
        }
        (MatchStrategy::Lexical, _) => Arc::new(LexicalMatcher::with_scorer(
            Box::new(NormalizedLevenshtein),
            config.lexical_threshold,
        )),
    }
}
