//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search pipeline (searches, hits, groups, matches, selections)
//! - Download queue (enqueue attempts, retries, permanent failures)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Search Pipeline Metrics
// =============================================================================

/// Subscription searches total by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvestarr_searches_total",
            "Total subscription searches",
        ),
        &["result"], // "completed", "skipped", "failed"
    )
    .unwrap()
});

/// Raw hits per search after the per-term fan-in.
pub static RAW_HITS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "harvestarr_raw_hits",
            "Raw indexer hits per subscription search",
        )
        .buckets(vec![0.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]),
        &[],
    )
    .unwrap()
});

/// Release groups per search after normalization and grouping.
pub static SCENE_GROUPS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "harvestarr_scene_groups",
            "Release groups per subscription search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        &[],
    )
    .unwrap()
});

/// Groups matched/unmatched per search.
pub static MATCH_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvestarr_match_results_total", "Group match outcomes"),
        &["outcome"], // "matched", "unmatched"
    )
    .unwrap()
});

/// Releases selected for grabbing.
pub static RELEASES_SELECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvestarr_releases_selected_total",
        "Total releases selected by quality profiles",
    )
    .unwrap()
});

/// Discovery notices emitted for unknown-scene candidates.
pub static DISCOVERY_NOTICES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvestarr_discovery_notices_total",
        "Total unknown-scene discovery notices",
    )
    .unwrap()
});

// =============================================================================
// Download Queue Metrics
// =============================================================================

/// Enqueue attempts total by result.
pub static ENQUEUE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvestarr_enqueue_attempts_total",
            "Total download-client enqueue attempts",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Retry job runs total.
pub static RETRY_RUNS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("harvestarr_retry_runs_total", "Total retry job runs").unwrap()
});

/// Items that became permanent failures.
pub static PERMANENT_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "harvestarr_permanent_failures_total",
        "Queue items observed at the attempt cap",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(RAW_HITS.clone()),
        Box::new(SCENE_GROUPS.clone()),
        Box::new(MATCH_RESULTS.clone()),
        Box::new(RELEASES_SELECTED.clone()),
        Box::new(DISCOVERY_NOTICES.clone()),
        Box::new(ENQUEUE_ATTEMPTS.clone()),
        Box::new(RETRY_RUNS.clone()),
        Box::new(PERMANENT_FAILURES.clone()),
    ]
}
