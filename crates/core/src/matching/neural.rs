//! Neural (cross-encoder) matching strategy.
//!
//! Scores `(group title, candidate title)` pairs jointly through the shared
//! ranker. The subscribed entity's own name is stripped from the start of
//! group titles before scoring; otherwise every candidate containing the
//! name looks like a strong match regardless of the actual scene.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::scene::SceneGroup;

use super::ranker::SharedRanker;
use super::types::{
    EntityRef, MatchEngine, MatchError, MatchOutcome, MatchedGroup, SceneRecord, Subscription,
};

/// Minimum `min(len) / max(len)` between query and candidate title. Rejects
/// pairing a short promo title to a much longer canonical title on semantic
/// score alone.
pub const MIN_TITLE_LEN_RATIO: f32 = 0.3;

/// Cross-encoder matcher over the shared ranker.
pub struct NeuralMatcher {
    ranker: SharedRanker,
    threshold: f32,
    min_len_ratio: f32,
}

impl NeuralMatcher {
    pub const DEFAULT_THRESHOLD: f32 = 0.75;

    pub fn new(ranker: SharedRanker, threshold: f32) -> Self {
        Self {
            ranker,
            threshold,
            min_len_ratio: MIN_TITLE_LEN_RATIO,
        }
    }

    /// Strip any of `names` from the START of the title only, repeatedly.
    ///
    /// Occurrences mid- or end-title are part of the scene name and stay.
    fn strip_leading_names(title: &str, names: &[String]) -> String {
        let mut current = title.trim().to_string();

        'outer: loop {
            let lower = current.to_lowercase();
            for name in names {
                let name = name.trim().to_lowercase();
                if name.is_empty() || !lower.starts_with(&name) {
                    continue;
                }
                // Only strip at a word boundary.
                let rest = &current[name.len()..];
                if !rest.is_empty() && rest.chars().next().is_some_and(|c| c.is_alphanumeric()) {
                    continue;
                }
                let stripped = rest
                    .trim_start_matches(|c: char| c.is_whitespace() || "-_.,:;|&".contains(c))
                    .to_string();
                if stripped.is_empty() {
                    // Nothing left but the name itself; keep it.
                    break 'outer;
                }
                current = stripped;
                continue 'outer;
            }
            break;
        }

        current
    }

    /// Remove `names` anywhere in a candidate title (word-boundary-ish).
    fn strip_names_anywhere(title: &str, names: &[String]) -> String {
        let mut current = title.to_string();
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let lower = current.to_lowercase();
            let needle = name.to_lowercase();
            if let Some(pos) = lower.find(&needle) {
                let before_ok = pos == 0
                    || !lower[..pos].chars().next_back().is_some_and(|c| c.is_alphanumeric());
                let after = pos + needle.len();
                let after_ok = after >= lower.len()
                    || !lower[after..].chars().next().is_some_and(|c| c.is_alphanumeric());
                if before_ok && after_ok {
                    current = format!("{} {}", &current[..pos], &current[after..]);
                }
            }
        }

        let cleaned = current.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            title.to_string()
        } else {
            cleaned
        }
    }

    fn len_ratio(a: &str, b: &str) -> f32 {
        let la = a.chars().count() as f32;
        let lb = b.chars().count() as f32;
        if la == 0.0 || lb == 0.0 {
            return 0.0;
        }
        la.min(lb) / la.max(lb)
    }
}

#[async_trait]
impl MatchEngine for NeuralMatcher {
    fn name(&self) -> &str {
        "neural"
    }

    async fn assign(
        &self,
        subscription: &Subscription,
        groups: Vec<SceneGroup>,
        candidates: Vec<SceneRecord>,
    ) -> Result<MatchOutcome, MatchError> {
        let mut outcome = MatchOutcome::default();
        if groups.is_empty() {
            outcome.unmatched = groups;
            return Ok(outcome);
        }

        let sub_names = subscription.all_names();

        // For performer subscriptions the candidate titles carry performer
        // names too; strip them so both sides of the pair are name-free.
        let candidate_titles: Vec<String> = candidates
            .iter()
            .map(|c| match subscription.entity {
                EntityRef::Performer(_) => {
                    let mut names = c.performer_names.clone();
                    names.extend(sub_names.iter().cloned());
                    Self::strip_names_anywhere(&c.title, &names)
                }
                _ => c.title.clone(),
            })
            .collect();

        let mut matched_scene_ids: HashSet<i64> = HashSet::new();

        // One lease for the whole batch: load before the first group, unload
        // after the last, regardless of per-group scoring errors.
        let lease = self.ranker.acquire().await?;

        for group in groups {
            let query = Self::strip_leading_names(&group.scene_title, &sub_names);

            let available: Vec<usize> = (0..candidates.len())
                .filter(|i| !matched_scene_ids.contains(&candidates[*i].id))
                .collect();
            let pool: Vec<String> = available
                .iter()
                .map(|&i| candidate_titles[i].clone())
                .collect();

            if pool.is_empty() {
                outcome.unmatched.push(group);
                continue;
            }

            match lease.find_best_match(&query, &pool, self.threshold).await {
                Ok(Some(ranked)) => {
                    let idx = available[ranked.index];
                    let candidate_title = &candidate_titles[idx];
                    let ratio = Self::len_ratio(&query, candidate_title);
                    if ratio < self.min_len_ratio {
                        debug!(
                            group = %group.scene_title,
                            candidate = %candidate_title,
                            ratio,
                            "Rejected match on title length ratio"
                        );
                        outcome.unmatched.push(group);
                        continue;
                    }

                    let scene = candidates[idx].clone();
                    debug!(
                        group = %group.scene_title,
                        scene_id = scene.id,
                        score = ranked.score,
                        "Neural match"
                    );
                    matched_scene_ids.insert(scene.id);
                    outcome.matched.push(MatchedGroup {
                        scene,
                        group,
                        score: ranked.score,
                    });
                }
                Ok(None) => outcome.unmatched.push(group),
                Err(e) => {
                    warn!(group = %group.scene_title, error = %e, "Scoring failed, group left unmatched");
                    outcome.unmatched.push(group);
                }
            }
        }

        lease.release().await;

        Ok(outcome)
    }
}
