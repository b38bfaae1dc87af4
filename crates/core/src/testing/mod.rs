//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of all external service traits,
//! allowing comprehensive pipeline testing without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvestarr_core::testing::{MockIndexer, MockMetadataStore, MockTorrentClient};
//!
//! let indexer = MockIndexer::new();
//! let metadata = MockMetadataStore::new();
//! let client = MockTorrentClient::new();
//!
//! // Configure mock responses
//! indexer.set_default_results(vec![/* hits */]).await;
//! metadata.set_subscription(/* ... */).await;
//! ```

mod mock_indexer;
mod mock_ranker;
mod mock_stores;
mod mock_torrent_client;

pub use mock_indexer::MockIndexer;
pub use mock_ranker::MockRanker;
pub use mock_stores::{MockMetadataStore, MockProfileStore};
pub use mock_torrent_client::MockTorrentClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::indexer::RawSearchHit;
    use crate::matching::{EntityRef, SceneRecord, Subscription};
    use crate::selection::{QualityProfile, QualityProfileItem};

    /// Create a raw search hit with reasonable defaults.
    pub fn raw_hit(title: &str, indexer: &str, info_hash: Option<&str>, seeders: u32) -> RawSearchHit {
        RawSearchHit {
            title: title.to_string(),
            indexer_id: indexer.to_lowercase(),
            indexer: indexer.to_string(),
            size_bytes: 1024 * 1024 * 700,
            seeders,
            leechers: seeders / 2,
            quality: crate::indexer::parse::parse_quality(title),
            source: crate::indexer::parse::parse_source(title),
            download_url: None,
            magnet_uri: info_hash.map(|h| format!("magnet:?xt=urn:btih:{}", h)),
            info_hash: info_hash.map(str::to_string),
        }
    }

    /// Create a performer subscription.
    pub fn performer_subscription(id: i64, name: &str, aliases: &[&str]) -> Subscription {
        Subscription {
            entity: EntityRef::Performer(id),
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a candidate scene record.
    pub fn scene(id: i64, title: &str) -> SceneRecord {
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

    /// Create a single-item accept-anything quality profile.
    pub fn any_profile(id: i64) -> QualityProfile {
        QualityProfile {
            id,
            name: "any".to_string(),
            items: vec![QualityProfileItem::any()],
        }
    }
}
