//! Subscription search pipeline implementation.
//!
//! Drives one subscription-search invocation through the full flow:
//! search terms → raw hits → dedup → name filter → normalize/group → match →
//! {select | discovery} → optional enqueue. Stages run sequentially; a failed
//! search term or group never aborts the run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, PipelineConfig};
use crate::indexer::{
    deduplicate_hits, IndexerSearcher, JackettSearcher, NameIntegrityFilter, RawSearchHit,
};
use crate::matching::{
    create_match_engine, MatchEngine, MetadataStore, NeuralRanker, Subscription,
};
use crate::metrics;
use crate::queue::{
    Enqueuer, QueueStore, RetryPolicy, RetryReport, SingleRetryOutcome, SqliteQueueStore,
};
use crate::scene::{group_releases, TitleNormalizer};
use crate::selection::{DiscoveryReporter, QualityProfileStore, QualitySelector};
use crate::torrent_client::{QBittorrentClient, TorrentClient};

use super::types::{
    PipelineError, SearchReport, SelectedRelease, SubscriptionSearchRequest, TermError,
};

/// The subscription search pipeline.
pub struct SearchPipeline {
    searcher: Option<Arc<dyn IndexerSearcher>>,
    metadata: Arc<dyn MetadataStore>,
    profiles: Arc<dyn QualityProfileStore>,
    matcher: Arc<dyn MatchEngine>,
    enqueuer: Option<Arc<Enqueuer>>,
    normalizer: TitleNormalizer,
    selector: QualitySelector,
    reporter: DiscoveryReporter,
    config: PipelineConfig,
}

impl SearchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        searcher: Option<Arc<dyn IndexerSearcher>>,
        metadata: Arc<dyn MetadataStore>,
        profiles: Arc<dyn QualityProfileStore>,
        matcher: Arc<dyn MatchEngine>,
        enqueuer: Option<Arc<Enqueuer>>,
        selector: QualitySelector,
        reporter: DiscoveryReporter,
        config: PipelineConfig,
    ) -> Self {
        Self {
            searcher,
            metadata,
            profiles,
            matcher,
            enqueuer,
            normalizer: TitleNormalizer::new(),
            selector,
            reporter,
            config,
        }
    }

    /// Wire a pipeline from configuration.
    ///
    /// The broker and download client are optional sections: when absent,
    /// the matching operations report the not-configured state instead of
    /// failing. The metadata and profile stores always come from the caller.
    pub fn from_config(
        config: &Config,
        metadata: Arc<dyn MetadataStore>,
        profiles: Arc<dyn QualityProfileStore>,
        ranker: Option<Arc<dyn NeuralRanker>>,
    ) -> Result<Self, PipelineError> {
        let searcher: Option<Arc<dyn IndexerSearcher>> = config
            .jackett
            .clone()
            .map(|jackett| Arc::new(JackettSearcher::new(jackett)) as Arc<dyn IndexerSearcher>);

        let enqueuer = match config.qbittorrent.clone() {
            Some(qb) => {
                let store: Arc<dyn QueueStore> =
                    Arc::new(SqliteQueueStore::new(&config.database.path)?);
                let client: Arc<dyn TorrentClient> = Arc::new(QBittorrentClient::new(qb));
                Some(Arc::new(Enqueuer::new(
                    store,
                    client,
                    RetryPolicy {
                        max_attempts: config.queue.max_attempts,
                        min_retry_interval: Duration::from_secs(
                            config.queue.min_retry_interval_secs,
                        ),
                        add_timeout: Duration::from_secs(config.queue.add_timeout_secs),
                    },
                )))
            }
            None => None,
        };

        Ok(Self::new(
            searcher,
            metadata,
            profiles,
            create_match_engine(&config.matching, ranker),
            enqueuer,
            QualitySelector::new(config.selection.min_group_members),
            DiscoveryReporter::new(config.selection.discovery_min_indexers),
            config.pipeline.clone(),
        ))
    }

    /// Search all terms sequentially, tolerating per-term failures.
    async fn gather_hits(
        &self,
        searcher: &Arc<dyn IndexerSearcher>,
        subscription: &Subscription,
        include_aliases: bool,
    ) -> (Vec<RawSearchHit>, Vec<TermError>) {
        let mut hits = Vec::new();
        let mut term_errors = Vec::new();

        for term in subscription.search_terms(include_aliases) {
            match searcher.search(&term, self.config.search_limit).await {
                Ok(term_hits) => {
                    debug!(term = %term, hits = term_hits.len(), "Search term complete");
                    hits.extend(term_hits);
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "Search term failed, continuing");
                    term_errors.push(TermError {
                        term,
                        error: e.to_string(),
                    });
                }
            }
        }

        (hits, term_errors)
    }

    /// Run one subscription search.
    ///
    /// Missing subscription is an error; missing broker or quality profile
    /// is an expected state and yields a skipped report with a reason.
    pub async fn search_for_subscription(
        &self,
        request: &SubscriptionSearchRequest,
    ) -> Result<SearchReport, PipelineError> {
        let subscription = self
            .metadata
            .find_subscription(request.entity)
            .await?
            .ok_or(PipelineError::SubscriptionNotFound(request.entity))?;

        let Some(searcher) = &self.searcher else {
            info!(entity = %request.entity, "No search broker configured, skipping");
            metrics::SEARCHES_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(SearchReport::skipped("no search broker configured"));
        };

        let Some(profile) = self.profiles.find_by_id(request.quality_profile_id).await? else {
            info!(
                entity = %request.entity,
                profile_id = request.quality_profile_id,
                "Quality profile not configured, skipping"
            );
            metrics::SEARCHES_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(SearchReport::skipped(format!(
                "quality profile {} not configured",
                request.quality_profile_id
            )));
        };

        info!(entity = %request.entity, name = %subscription.name, "Subscription search started");

        let (raw_hits, term_errors) = self
            .gather_hits(searcher, &subscription, request.include_aliases)
            .await;
        metrics::RAW_HITS.with_label_values(&[]).observe(raw_hits.len() as f64);

        let releases = deduplicate_hits(raw_hits);
        let name_filter = NameIntegrityFilter::new(&subscription.all_names());
        let releases = name_filter.filter(releases);

        let groups = group_releases(releases, &self.normalizer);
        metrics::SCENE_GROUPS.with_label_values(&[]).observe(groups.len() as f64);

        let candidates = self
            .metadata
            .find_candidate_scenes(request.entity, self.config.candidate_limit)
            .await?;

        let outcome = self
            .matcher
            .assign(&subscription, groups, candidates)
            .await?;
        metrics::MATCH_RESULTS
            .with_label_values(&["matched"])
            .inc_by(outcome.matched.len() as u64);
        metrics::MATCH_RESULTS
            .with_label_values(&["unmatched"])
            .inc_by(outcome.unmatched.len() as u64);

        let mut selected = Vec::new();
        for matched in &outcome.matched {
            if let Some(release) = self.selector.select(&matched.group, &profile.items) {
                selected.push(SelectedRelease {
                    scene_id: Some(matched.scene.id),
                    scene_title: matched.group.scene_title.clone(),
                    release: release.clone(),
                });
            }
        }

        if request.include_metadata_missing {
            for group in &outcome.unmatched {
                if let Some(release) = self.selector.select_unmatched(group, &profile.items) {
                    selected.push(SelectedRelease {
                        scene_id: None,
                        scene_title: group.scene_title.clone(),
                        release: release.clone(),
                    });
                }
            }
        }
        metrics::RELEASES_SELECTED.inc_by(selected.len() as u64);

        let discoveries = self.reporter.report(&outcome.unmatched);
        metrics::DISCOVERY_NOTICES.inc_by(discoveries.len() as u64);

        if self.config.auto_enqueue {
            if let Some(enqueuer) = &self.enqueuer {
                for sel in &selected {
                    match enqueuer.enqueue_release(sel.scene_id, &sel.release).await {
                        Ok(item) => {
                            metrics::ENQUEUE_ATTEMPTS
                                .with_label_values(&[if item.client_hash.is_some() {
                                    "success"
                                } else {
                                    "failed"
                                }])
                                .inc();
                        }
                        Err(e) => {
                            warn!(title = %sel.release.title, error = %e, "Enqueue failed");
                            metrics::ENQUEUE_ATTEMPTS.with_label_values(&["failed"]).inc();
                        }
                    }
                }
            } else {
                debug!("auto_enqueue set but no download client configured");
            }
        }

        info!(
            entity = %request.entity,
            selected = selected.len(),
            matched = outcome.matched.len(),
            unmatched = outcome.unmatched.len(),
            discoveries = discoveries.len(),
            "Subscription search finished"
        );
        metrics::SEARCHES_TOTAL.with_label_values(&["completed"]).inc();

        Ok(SearchReport {
            selected,
            discoveries,
            term_errors,
            skipped: None,
        })
    }

    /// Retry all retryable `add_failed` items.
    ///
    /// Missing download client is an expected state, reported, never thrown.
    pub async fn retry_failed_torrents(
        &self,
        max_attempts: u32,
    ) -> Result<RetryReport, PipelineError> {
        let Some(enqueuer) = &self.enqueuer else {
            return Ok(RetryReport::not_configured("no download client configured"));
        };

        metrics::RETRY_RUNS.inc();
        let report = enqueuer.retry_failed(max_attempts).await?;
        metrics::PERMANENT_FAILURES.inc_by(report.permanent_failures as u64);
        Ok(report)
    }

    /// Manually retry one queue item.
    pub async fn retry_single_torrent(
        &self,
        id: &str,
    ) -> Result<SingleRetryOutcome, PipelineError> {
        let Some(enqueuer) = &self.enqueuer else {
            return Err(PipelineError::NotConfigured(
                "no download client configured".to_string(),
            ));
        };

        Ok(enqueuer.retry_single(id).await?)
    }
}
