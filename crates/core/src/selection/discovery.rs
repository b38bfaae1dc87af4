//! Discovery reporting for corroborated-but-unmatched release groups.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scene::SceneGroup;

/// An unmatched group corroborated by enough distinct indexers to be worth
/// surfacing as an unknown-scene candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryNotice {
    pub scene_title: String,
    pub indexer_count: usize,
    pub torrent_count: usize,
}

/// Flags high-confidence unmatched groups. Log-only: notices are recomputed
/// every run and never persisted, so a recurring unknown scene keeps getting
/// reported until it is matched.
pub struct DiscoveryReporter {
    min_indexers: usize,
}

impl DiscoveryReporter {
    pub const DEFAULT_MIN_INDEXERS: usize = 3;

    pub fn new(min_indexers: usize) -> Self {
        Self { min_indexers }
    }

    /// Distinct indexer ids contributing torrents to a group.
    fn distinct_indexers(group: &SceneGroup) -> usize {
        let mut ids: Vec<&str> = group
            .torrents
            .iter()
            .flat_map(|t| t.sources.iter())
            .map(|s| s.indexer_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Report every unmatched group that clears the indexer threshold.
    pub fn report(&self, unmatched: &[SceneGroup]) -> Vec<DiscoveryNotice> {
        let mut notices = Vec::new();

        for group in unmatched {
            let indexer_count = Self::distinct_indexers(group);
            if indexer_count < self.min_indexers {
                continue;
            }

            info!(
                scene_title = %group.scene_title,
                indexer_count,
                torrents = group.torrents.len(),
                "Discovered unknown-scene candidate"
            );
            notices.push(DiscoveryNotice {
                scene_title: group.scene_title.clone(),
                indexer_count,
                torrent_count: group.torrents.len(),
            });
        }

        notices
    }
}

impl Default for DiscoveryReporter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_INDEXERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{ReleaseSource, TorrentRelease};

    fn make_release(indexer_ids: &[&str]) -> TorrentRelease {
        TorrentRelease {
            title: "Test".to_string(),
            info_hash: None,
            size_bytes: 1000,
            seeders: 1,
            leechers: 0,
            quality: None,
            source: None,
            download_url: None,
            sources: indexer_ids
                .iter()
                .map(|id| ReleaseSource {
                    indexer_id: id.to_string(),
                    indexer: id.to_uppercase(),
                    seeders: 1,
                    leechers: 0,
                    download_url: None,
                })
                .collect(),
        }
    }

    fn make_group(title: &str, torrents: Vec<TorrentRelease>) -> SceneGroup {
        SceneGroup {
            scene_title: title.to_string(),
            torrents,
        }
    }

    #[test]
    fn test_reports_groups_at_threshold() {
        let reporter = DiscoveryReporter::new(3);
        let groups = vec![make_group(
            "Corroborated Scene",
            vec![make_release(&["i1", "i2"]), make_release(&["i3"])],
        )];

        let notices = reporter.report(&groups);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].indexer_count, 3);
        assert_eq!(notices[0].torrent_count, 2);
    }

    #[test]
    fn test_below_threshold_is_silent() {
        let reporter = DiscoveryReporter::new(3);
        let groups = vec![make_group(
            "Thin Scene",
            vec![make_release(&["i1", "i1", "i2"])],
        )];

        assert!(reporter.report(&groups).is_empty());
    }

    #[test]
    fn test_duplicate_indexer_ids_count_once() {
        let reporter = DiscoveryReporter::new(2);
        let groups = vec![make_group(
            "Scene",
            vec![make_release(&["i1"]), make_release(&["i1"])],
        )];

        assert!(reporter.report(&groups).is_empty());
    }

    #[test]
    fn test_rerun_reports_again() {
        // Notices are never persisted; an identical rerun reports identically.
        let reporter = DiscoveryReporter::new(2);
        let groups = vec![make_group(
            "Scene",
            vec![make_release(&["i1", "i2", "i3"])],
        )];

        let first = reporter.report(&groups);
        let second = reporter.report(&groups);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
