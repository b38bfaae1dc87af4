use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Search broker; the pipeline skips searches when absent.
    #[serde(default)]
    pub jackett: Option<JackettConfig>,
    /// Download client; enqueue and retry are skipped when absent.
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("harvestarr.db")
}

/// Jackett search broker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettConfig {
    /// Jackett server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// Jackett API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Configured indexers
    #[serde(default)]
    pub indexers: Vec<IndexerConfig>,
}

/// A single indexer behind the broker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// qBittorrent download client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// WebUI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Optional save path override passed on add
    #[serde(default)]
    pub download_path: Option<String>,
}

fn default_timeout() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// Matching strategy selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Lexical,
    Neural,
}

/// Match engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: MatchStrategy,
    #[serde(default = "default_lexical_threshold")]
    pub lexical_threshold: f32,
    #[serde(default = "default_neural_threshold")]
    pub neural_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            lexical_threshold: default_lexical_threshold(),
            neural_threshold: default_neural_threshold(),
        }
    }
}

fn default_strategy() -> MatchStrategy {
    MatchStrategy::Lexical
}

fn default_lexical_threshold() -> f32 {
    0.8
}

fn default_neural_threshold() -> f32 {
    0.75
}

/// Release selection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Minimum torrents a metadata-less group needs before selection.
    #[serde(default = "default_min_group_members")]
    pub min_group_members: usize,
    /// Minimum distinct indexers for a discovery notice.
    #[serde(default = "default_discovery_min_indexers")]
    pub discovery_min_indexers: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_group_members: default_min_group_members(),
            discovery_min_indexers: default_discovery_min_indexers(),
        }
    }
}

fn default_min_group_members() -> usize {
    2
}

fn default_discovery_min_indexers() -> usize {
    3
}

/// Download queue retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Minimum seconds between retry attempts for one item.
    #[serde(default = "default_retry_interval_secs")]
    pub min_retry_interval_secs: u64,
    /// Bounded wait for a client hash per enqueue attempt.
    #[serde(default = "default_add_timeout_secs")]
    pub add_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_retry_interval_secs: default_retry_interval_secs(),
            add_timeout_secs: default_add_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_interval_secs() -> u64 {
    5 * 60
}

fn default_add_timeout_secs() -> u64 {
    10
}

/// Search pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Per-term result cap passed to the broker.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Candidate scene cap per matching run.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// Enqueue selected releases automatically after a search.
    #[serde(default)]
    pub auto_enqueue: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            candidate_limit: default_candidate_limit(),
            auto_enqueue: false,
        }
    }
}

fn default_search_limit() -> u32 {
    100
}

fn default_candidate_limit() -> usize {
    500
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jackett: Option<SanitizedJackettConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbittorrent: Option<SanitizedQBittorrentConfig>,
    pub matching: MatchingConfig,
    pub selection: SelectionConfig,
    pub queue: QueueConfig,
    pub pipeline: PipelineConfig,
}

/// Sanitized Jackett config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJackettConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub indexers: usize,
}

/// Sanitized qBittorrent config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database: config.database.clone(),
            jackett: config.jackett.as_ref().map(|j| SanitizedJackettConfig {
                url: j.url.clone(),
                api_key_configured: !j.api_key.is_empty(),
                timeout_secs: j.timeout_secs,
                indexers: j.indexers.len(),
            }),
            qbittorrent: config.qbittorrent.as_ref().map(|q| SanitizedQBittorrentConfig {
                url: q.url.clone(),
                username: q.username.clone(),
                password_configured: !q.password.is_empty(),
                timeout_secs: q.timeout_secs,
            }),
            matching: config.matching.clone(),
            selection: config.selection.clone(),
            queue: config.queue.clone(),
            pipeline: config.pipeline.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("harvestarr.db"));
        assert!(config.jackett.is_none());
        assert_eq!(config.matching.strategy, MatchStrategy::Lexical);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.min_retry_interval_secs, 300);
        assert_eq!(config.selection.discovery_min_indexers, 3);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[database]
path = "/data/queue.db"

[jackett]
url = "http://localhost:9117"
api_key = "secret"

[[jackett.indexers]]
name = "alpha"

[[jackett.indexers]]
name = "beta"
enabled = false

[qbittorrent]
url = "http://localhost:8080"
username = "admin"
password = "hunter2"

[matching]
strategy = "neural"
neural_threshold = 0.9

[pipeline]
auto_enqueue = true
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let jackett = config.jackett.unwrap();
        assert_eq!(jackett.indexers.len(), 2);
        assert!(jackett.indexers[0].enabled);
        assert!(!jackett.indexers[1].enabled);
        assert_eq!(config.matching.strategy, MatchStrategy::Neural);
        assert!((config.matching.neural_threshold - 0.9).abs() < f32::EPSILON);
        assert!(config.pipeline.auto_enqueue);
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let toml = r#"
[jackett]
url = "http://localhost:9117"
api_key = "secret"

[qbittorrent]
url = "http://localhost:8080"
username = "admin"
password = "hunter2"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("api_key_configured"));
    }
}
