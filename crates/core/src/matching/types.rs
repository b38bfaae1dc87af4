//! Types and trait seams for group-to-scene matching.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::SceneGroup;

/// Reference to a subscribed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Performer(i64),
    Studio(i64),
    Scene(i64),
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Performer(id) => write!(f, "performer/{}", id),
            EntityRef::Studio(id) => write!(f, "studio/{}", id),
            EntityRef::Scene(id) => write!(f, "scene/{}", id),
        }
    }
}

/// A subscribed entity with its search names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub entity: EntityRef,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Subscription {
    /// Terms to search, most canonical first.
    pub fn search_terms(&self, include_aliases: bool) -> Vec<String> {
        let mut terms = vec![self.name.clone()];
        if include_aliases {
            for alias in &self.aliases {
                if !terms.iter().any(|t| t.eq_ignore_ascii_case(alias)) {
                    terms.push(alias.clone());
                }
            }
        }
        terms
    }

    /// All known names (canonical + aliases) for filtering and stripping.
    pub fn all_names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        names.extend(self.aliases.iter().cloned());
        names
    }
}

/// A known local scene, candidate for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub performer_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_id: Option<i64>,
    #[serde(default)]
    pub performer_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_name: Option<String>,
}

/// A group assigned to a known scene.
#[derive(Debug, Clone)]
pub struct MatchedGroup {
    pub scene: SceneRecord,
    pub group: SceneGroup,
    /// Strategy confidence for this assignment (0.0-1.0).
    pub score: f32,
}

/// Result of one matching run.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedGroup>,
    pub unmatched: Vec<SceneGroup>,
}

/// Errors that can occur during matching.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Ranker error: {0}")]
    Ranker(#[from] RankerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from the neural ranker backend.
#[derive(Debug, Error)]
pub enum RankerError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Model unload failed: {0}")]
    UnloadFailed(String),

    #[error("Scoring failed: {0}")]
    ScoringFailed(String),

    #[error("Model not loaded")]
    NotLoaded,
}

/// Errors from the metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata store error: {0}")]
    Store(String),
}

/// A scored candidate position returned by the ranker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedMatch {
    /// Index into the candidate list passed to `find_best_match`.
    pub index: usize,
    /// Cross-encoder score (0.0-1.0).
    pub score: f32,
}

/// Cross-encoder ranking backend.
///
/// The model is an expensive shared resource; callers bracket batches with
/// `initialize` / `unload` via [`super::SharedRanker`] rather than driving
/// these directly.
#[async_trait]
pub trait NeuralRanker: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Load the model into memory.
    async fn initialize(&self) -> Result<(), RankerError>;

    /// Release the model.
    async fn unload(&self) -> Result<(), RankerError>;

    /// Jointly score `(query, candidate)` pairs and return the best candidate
    /// at or above `threshold`, if any.
    async fn find_best_match(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f32,
    ) -> Result<Option<RankedMatch>, RankerError>;
}

/// Store of subscriptions and candidate scenes.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Look up a subscription by entity reference.
    async fn find_subscription(
        &self,
        entity: EntityRef,
    ) -> Result<Option<Subscription>, MetadataError>;

    /// Candidate scenes for an entity, capped at `limit`.
    async fn find_candidate_scenes(
        &self,
        entity: EntityRef,
        limit: usize,
    ) -> Result<Vec<SceneRecord>, MetadataError>;
}

/// Assigns release groups to known local scenes.
///
/// Greedy and first-group-wins: once a scene is claimed it leaves the
/// candidate pool for the rest of the run. Not globally optimal.
#[async_trait]
pub trait MatchEngine: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Partition `groups` into matched and unmatched against `candidates`.
    async fn assign(
        &self,
        subscription: &Subscription,
        groups: Vec<SceneGroup>,
        candidates: Vec<SceneRecord>,
    ) -> Result<MatchOutcome, MatchError>;
}
