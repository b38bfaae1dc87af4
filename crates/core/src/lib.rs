pub mod config;
pub mod indexer;
pub mod matching;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod scene;
pub mod selection;
pub mod testing;
pub mod torrent_client;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use indexer::{
    deduplicate_hits, IndexerSearcher, JackettSearcher, NameIntegrityFilter, RawSearchHit,
    TorrentRelease,
};
pub use matching::{
    create_match_engine, EntityRef, LexicalMatcher, MatchEngine, MatchOutcome, MetadataStore,
    NeuralMatcher, NeuralRanker, SceneRecord, SharedRanker, Subscription,
};
pub use pipeline::{SearchPipeline, SearchReport, SubscriptionSearchRequest};
pub use queue::{
    DownloadQueueItem, Enqueuer, QueueStatus, QueueStore, RetryPolicy, RetryReport,
    SqliteQueueStore, StatusReconciler,
};
pub use scene::{group_releases, SceneGroup, TitleNormalizer};
pub use selection::{
    DiscoveryReporter, QualityProfile, QualityProfileItem, QualityProfileStore, QualitySelector,
};
pub use torrent_client::{QBittorrentClient, TorrentClient};
