//! Quality-profile based release selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indexer::TorrentRelease;
use crate::scene::SceneGroup;

const GIB: u64 = 1024 * 1024 * 1024;

/// A quality or source constraint: a concrete tag or the "any" wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagRule {
    Any,
    Exact(String),
}

impl From<String> for TagRule {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("any") {
            TagRule::Any
        } else {
            TagRule::Exact(s)
        }
    }
}

impl From<TagRule> for String {
    fn from(rule: TagRule) -> Self {
        match rule {
            TagRule::Any => "any".to_string(),
            TagRule::Exact(s) => s,
        }
    }
}

impl TagRule {
    fn matches(&self, tag: Option<&str>) -> bool {
        match self {
            TagRule::Any => true,
            TagRule::Exact(wanted) => {
                tag.is_some_and(|t| t.eq_ignore_ascii_case(wanted))
            }
        }
    }
}

/// Seeder floor: a number or the "any" wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeederRule {
    Min(u32),
    Any(AnyLiteral),
}

/// Serde helper for the literal string `"any"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyLiteral {
    Any,
}

impl SeederRule {
    pub fn any() -> Self {
        SeederRule::Any(AnyLiteral::Any)
    }

    fn matches(&self, seeders: u32) -> bool {
        match self {
            SeederRule::Any(_) => true,
            SeederRule::Min(n) => seeders >= *n,
        }
    }
}

/// One entry of an ordered quality profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfileItem {
    pub quality: TagRule,
    pub source: TagRule,
    pub min_seeders: SeederRule,
    /// Maximum size in GB; 0 = unlimited.
    #[serde(default)]
    pub max_size_gb: f64,
}

impl QualityProfileItem {
    /// Wildcard item accepting everything.
    pub fn any() -> Self {
        Self {
            quality: TagRule::Any,
            source: TagRule::Any,
            min_seeders: SeederRule::any(),
            max_size_gb: 0.0,
        }
    }

    fn matches(&self, release: &TorrentRelease) -> bool {
        if !self.quality.matches(release.quality.as_deref()) {
            return false;
        }
        if !self.source.matches(release.source.as_deref()) {
            return false;
        }
        if !self.min_seeders.matches(release.seeders) {
            return false;
        }
        if self.max_size_gb > 0.0 {
            let max_bytes = (self.max_size_gb * GIB as f64) as u64;
            if release.size_bytes > max_bytes {
                return false;
            }
        }
        true
    }
}

/// An ordered preference list of quality constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i64,
    pub name: String,
    pub items: Vec<QualityProfileItem>,
}

/// Errors from the quality profile store.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile store error: {0}")]
    Store(String),
}

/// Store of quality profiles.
#[async_trait]
pub trait QualityProfileStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<QualityProfile>, ProfileError>;
}

/// Picks one release per group according to an ordered profile.
pub struct QualitySelector {
    /// Minimum torrents a metadata-less group needs before anything in it is
    /// eligible ("seen on N indexers" confidence gate).
    min_group_members: usize,
}

impl QualitySelector {
    pub const DEFAULT_MIN_GROUP_MEMBERS: usize = 2;

    pub fn new(min_group_members: usize) -> Self {
        Self { min_group_members }
    }

    /// Walk profile items in order; the first item with a non-empty filtered
    /// subset wins and yields the subset's highest-seeder release.
    ///
    /// `None` is the normal "no suitable release" outcome, not an error.
    pub fn select<'a>(
        &self,
        group: &'a SceneGroup,
        items: &[QualityProfileItem],
    ) -> Option<&'a TorrentRelease> {
        for item in items {
            let best = group
                .torrents
                .iter()
                .filter(|t| item.matches(t))
                .max_by_key(|t| t.seeders);
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// Selection for groups without scene metadata: same walk, but the group
    /// must first clear the member-count confidence gate.
    pub fn select_unmatched<'a>(
        &self,
        group: &'a SceneGroup,
        items: &[QualityProfileItem],
    ) -> Option<&'a TorrentRelease> {
        if group.torrents.len() < self.min_group_members {
            return None;
        }
        self.select(group, items)
    }
}

impl Default for QualitySelector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_GROUP_MEMBERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ReleaseSource;

    fn make_release(quality: Option<&str>, source: Option<&str>, seeders: u32) -> TorrentRelease {
        TorrentRelease {
            title: "Test".to_string(),
            info_hash: None,
            size_bytes: 1024 * 1024 * 500,
            seeders,
            leechers: 0,
            quality: quality.map(str::to_string),
            source: source.map(str::to_string),
            download_url: None,
            sources: vec![ReleaseSource {
                indexer_id: "i1".to_string(),
                indexer: "Alpha".to_string(),
                seeders,
                leechers: 0,
                download_url: None,
            }],
        }
    }

    fn make_group(torrents: Vec<TorrentRelease>) -> SceneGroup {
        SceneGroup {
            scene_title: "Test".to_string(),
            torrents,
        }
    }

    fn item(quality: &str, source: &str, min_seeders: SeederRule) -> QualityProfileItem {
        QualityProfileItem {
            quality: TagRule::from(quality.to_string()),
            source: TagRule::from(source.to_string()),
            min_seeders,
            max_size_gb: 0.0,
        }
    }

    #[test]
    fn test_profile_item_deserialization() {
        let json = r#"{"quality":"1080p","source":"any","min_seeders":5,"max_size_gb":2.5}"#;
        let parsed: QualityProfileItem = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.quality, TagRule::Exact("1080p".to_string()));
        assert_eq!(parsed.source, TagRule::Any);
        assert_eq!(parsed.min_seeders, SeederRule::Min(5));
        assert!((parsed.max_size_gb - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_min_seeders_any_literal() {
        let json = r#"{"quality":"any","source":"any","min_seeders":"any"}"#;
        let parsed: QualityProfileItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.min_seeders, SeederRule::any());
    }

    #[test]
    fn test_ordered_walk_prefers_earlier_items() {
        // Profile: 1080p/WEB-DL with 5+ seeders, then 720p with 1+ seeder.
        let items = vec![
            item("1080p", "WEB-DL", SeederRule::Min(5)),
            item("720p", "any", SeederRule::Min(1)),
        ];
        let group = make_group(vec![
            make_release(Some("1080p"), Some("WEB-DL"), 3), // fails seeder floor
            make_release(Some("720p"), Some("WEBRip"), 10),
        ]);

        let selected = QualitySelector::default().select(&group, &items).unwrap();
        assert_eq!(selected.quality.as_deref(), Some("720p"));
        assert_eq!(selected.seeders, 10);
    }

    #[test]
    fn test_highest_seeder_wins_within_item() {
        let items = vec![item("any", "any", SeederRule::any())];
        let group = make_group(vec![
            make_release(Some("1080p"), None, 4),
            make_release(Some("720p"), None, 40),
            make_release(Some("480p"), None, 11),
        ]);

        let selected = QualitySelector::default().select(&group, &items).unwrap();
        assert_eq!(selected.seeders, 40);
    }

    #[test]
    fn test_no_match_across_all_items_is_none() {
        let items = vec![item("2160p", "any", SeederRule::any())];
        let group = make_group(vec![make_release(Some("720p"), None, 10)]);

        assert!(QualitySelector::default().select(&group, &items).is_none());
    }

    #[test]
    fn test_max_size_zero_is_unlimited() {
        let items = vec![item("any", "any", SeederRule::any())];
        let mut huge = make_release(None, None, 1);
        huge.size_bytes = 900 * GIB;
        let group = make_group(vec![huge]);

        assert!(QualitySelector::default().select(&group, &items).is_some());
    }

    #[test]
    fn test_max_size_enforced() {
        let mut items = vec![item("any", "any", SeederRule::any())];
        items[0].max_size_gb = 1.0;

        let mut big = make_release(None, None, 1);
        big.size_bytes = 2 * GIB;
        let group = make_group(vec![big]);

        assert!(QualitySelector::default().select(&group, &items).is_none());
    }

    #[test]
    fn test_quality_match_requires_tag_when_exact() {
        let items = vec![item("1080p", "any", SeederRule::any())];
        // Untagged release cannot satisfy an exact quality rule.
        let group = make_group(vec![make_release(None, None, 10)]);

        assert!(QualitySelector::default().select(&group, &items).is_none());
    }

    #[test]
    fn test_unmatched_group_gated_on_member_count() {
        let items = vec![item("any", "any", SeederRule::any())];
        let selector = QualitySelector::new(2);

        let singleton = make_group(vec![make_release(None, None, 10)]);
        assert!(selector.select_unmatched(&singleton, &items).is_none());

        let corroborated = make_group(vec![
            make_release(None, None, 10),
            make_release(None, None, 5),
        ]);
        assert!(selector.select_unmatched(&corroborated, &items).is_some());
    }
}
