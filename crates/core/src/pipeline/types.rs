//! Types for the subscription search pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indexer::TorrentRelease;
use crate::matching::{EntityRef, MatchError, MetadataError};
use crate::queue::QueueError;
use crate::selection::{DiscoveryNotice, ProfileError};

/// Request for one subscription search invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSearchRequest {
    pub entity: EntityRef,
    pub quality_profile_id: i64,
    /// Also select from corroborated groups with no matched scene.
    #[serde(default)]
    pub include_metadata_missing: bool,
    /// Search alias names in addition to the canonical name.
    #[serde(default)]
    pub include_aliases: bool,
}

/// A release selected for grabbing, tagged with its scene when matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedRelease {
    /// Matched scene id; `None` for metadata-less selections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<i64>,
    pub scene_title: String,
    pub release: TorrentRelease,
}

/// Result of one subscription search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchReport {
    pub selected: Vec<SelectedRelease>,
    pub discoveries: Vec<DiscoveryNotice>,
    /// Search terms that failed, with the error message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub term_errors: Vec<TermError>,
    /// Set when the search could not run for an expected reason (missing
    /// broker/client/profile configuration); everything else is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// A failed search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermError {
    pub term: String,
    pub error: String,
}

impl SearchReport {
    /// Report for an expected not-configured state.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Errors that terminate a pipeline request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(EntityRef),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Profile store error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_report_is_empty() {
        let report = SearchReport::skipped("no broker configured");
        assert!(report.selected.is_empty());
        assert!(report.discoveries.is_empty());
        assert_eq!(report.skipped.as_deref(), Some("no broker configured"));
    }

    #[test]
    fn test_request_defaults() {
        let json = r#"{"entity":{"type":"performer","id":1},"quality_profile_id":2}"#;
        let req: SubscriptionSearchRequest = serde_json::from_str(json).unwrap();
        assert!(!req.include_metadata_missing);
        assert!(!req.include_aliases);
    }
}
