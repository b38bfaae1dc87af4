//! Lexical (string-similarity) matching strategy.
//!
//! No model, works entirely offline. The scorer is pluggable; the default is
//! a normalized Levenshtein similarity.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

use crate::scene::SceneGroup;

use super::types::{
    MatchEngine, MatchError, MatchOutcome, MatchedGroup, SceneRecord, Subscription,
};

/// Scores the similarity of two titles, 0.0-1.0.
pub trait SimilarityScorer: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, a: &str, b: &str) -> f32;
}

/// Levenshtein distance scaled into a 0.0-1.0 similarity, case-insensitive.
pub struct NormalizedLevenshtein;

impl NormalizedLevenshtein {
    fn levenshtein_distance(a: &str, b: &str) -> usize {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let a_len = a_chars.len();
        let b_len = b_chars.len();

        if a_len == 0 {
            return b_len;
        }
        if b_len == 0 {
            return a_len;
        }

        let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

        for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
            row[0] = i;
        }
        for (j, val) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
            *val = j;
        }

        for (i, a_char) in a_chars.iter().enumerate() {
            for (j, b_char) in b_chars.iter().enumerate() {
                let cost = if *a_char == *b_char { 0 } else { 1 };
                matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1)
                    .min(matrix[i + 1][j] + 1)
                    .min(matrix[i][j] + cost);
            }
        }

        matrix[a_len][b_len]
    }
}

impl SimilarityScorer for NormalizedLevenshtein {
    fn name(&self) -> &str {
        "normalized_levenshtein"
    }

    fn score(&self, a: &str, b: &str) -> f32 {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        let max_len = a.chars().count().max(b.chars().count());
        if max_len == 0 {
            return 1.0;
        }
        let distance = Self::levenshtein_distance(&a, &b);
        1.0 - (distance as f32 / max_len as f32)
    }
}

/// Greedy lexical matcher.
///
/// For each group the best-scoring unclaimed candidate at or above the
/// threshold wins; claimed scenes leave the pool for the rest of the run.
pub struct LexicalMatcher {
    scorer: Box<dyn SimilarityScorer>,
    threshold: f32,
}

impl LexicalMatcher {
    pub const DEFAULT_THRESHOLD: f32 = 0.8;

    /// Lexical matcher with the default scorer and threshold.
    pub fn new() -> Self {
        Self::with_scorer(Box::new(NormalizedLevenshtein), Self::DEFAULT_THRESHOLD)
    }

    /// Lexical matcher with a custom scorer and threshold.
    pub fn with_scorer(scorer: Box<dyn SimilarityScorer>, threshold: f32) -> Self {
        Self { scorer, threshold }
    }
}

impl Default for LexicalMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchEngine for LexicalMatcher {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn assign(
        &self,
        _subscription: &Subscription,
        groups: Vec<SceneGroup>,
        candidates: Vec<SceneRecord>,
    ) -> Result<MatchOutcome, MatchError> {
        let mut outcome = MatchOutcome::default();
        let mut matched_scene_ids: HashSet<i64> = HashSet::new();

        for group in groups {
            let best = candidates
                .iter()
                .filter(|c| !matched_scene_ids.contains(&c.id))
                .map(|c| (c, self.scorer.score(&group.scene_title, &c.title)))
                .filter(|(_, score)| *score >= self.threshold)
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            match best {
                Some((scene, score)) => {
                    debug!(
                        group = %group.scene_title,
                        scene_id = scene.id,
                        score,
                        "Lexical match"
                    );
                    matched_scene_ids.insert(scene.id);
                    outcome.matched.push(MatchedGroup {
                        scene: scene.clone(),
                        group,
                        score,
                    });
                }
                None => outcome.unmatched.push(group),
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{ReleaseSource, TorrentRelease};
    use crate::matching::EntityRef;

    fn make_group(title: &str) -> SceneGroup {
        SceneGroup {
            scene_title: title.to_string(),
            torrents: vec![TorrentRelease {
                title: title.to_string(),
                info_hash: None,
                size_bytes: 1000,
                seeders: 1,
                leechers: 0,
                quality: None,
                source: None,
                download_url: None,
                sources: vec![ReleaseSource {
                    indexer_id: "i1".to_string(),
                    indexer: "Alpha".to_string(),
                    seeders: 1,
                    leechers: 0,
                    download_url: None,
                }],
            }],
        }
    }

    fn make_scene(id: i64, title: &str) -> SceneRecord {
        SceneRecord {
            id,
            title: title.to_string(),
            date: None,
            performer_ids: vec![],
            studio_id: None,
            performer_names: vec![],
            studio_name: None,
        }
    }

    fn make_subscription() -> Subscription {
        Subscription {
            entity: EntityRef::Performer(1),
            name: "Jade Harper".to_string(),
            aliases: vec![],
        }
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(NormalizedLevenshtein::levenshtein_distance("abc", "abc"), 0);
        assert_eq!(NormalizedLevenshtein::levenshtein_distance("abc", "abd"), 1);
        assert_eq!(NormalizedLevenshtein::levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_score_identical_case_insensitive() {
        let scorer = NormalizedLevenshtein;
        assert_eq!(scorer.score("Beach Day", "beach day"), 1.0);
    }

    #[test]
    fn test_score_disjoint_is_low() {
        let scorer = NormalizedLevenshtein;
        assert!(scorer.score("Beach Day", "Mountain Night") < 0.5);
    }

    #[tokio::test]
    async fn test_assign_matches_equal_titles() {
        let matcher = LexicalMatcher::new();
        let outcome = matcher
            .assign(
                &make_subscription(),
                vec![make_group("Beach Day Adventure")],
                vec![make_scene(1, "Beach Day Adventure"), make_scene(2, "Other")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].scene.id, 1);
        assert!(outcome.unmatched.is_empty());
    }

    #[tokio::test]
    async fn test_assign_below_threshold_is_unmatched() {
        let matcher = LexicalMatcher::new();
        let outcome = matcher
            .assign(
                &make_subscription(),
                vec![make_group("Something Entirely Different")],
                vec![make_scene(1, "Beach Day Adventure")],
            )
            .await
            .unwrap();

        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_claims_scene_only_once() {
        let matcher = LexicalMatcher::new();
        let outcome = matcher
            .assign(
                &make_subscription(),
                vec![
                    make_group("Beach Day Adventure"),
                    make_group("Beach Day Adventure!"),
                ],
                vec![make_scene(1, "Beach Day Adventure")],
            )
            .await
            .unwrap();

        // First group claims the scene; the near-identical second cannot.
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_is_deterministic() {
        let matcher = LexicalMatcher::new();
        let groups = vec![
            make_group("Beach Day Adventure"),
            make_group("Mountain Night Hike"),
        ];
        let candidates = vec![
            make_scene(1, "Beach Day Adventure"),
            make_scene(2, "Mountain Night Hike"),
        ];

        let a = matcher
            .assign(&make_subscription(), groups.clone(), candidates.clone())
            .await
            .unwrap();
        let b = matcher
            .assign(&make_subscription(), groups, candidates)
            .await
            .unwrap();

        let ids_a: Vec<i64> = a.matched.iter().map(|m| m.scene.id).collect();
        let ids_b: Vec<i64> = b.matched.iter().map(|m| m.scene.id).collect();
        assert_eq!(ids_a, ids_b);
    }
}
