//! Deduplication of raw search hits across indexers.

use std::collections::HashMap;

use super::{RawSearchHit, ReleaseSource, TorrentRelease};

/// Key a hit groups under: info hash when available, otherwise a
/// title + size pseudo-key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Hash(String),
    TitleSize(String, u64),
}

fn key_for(hit: &RawSearchHit) -> DedupKey {
    match &hit.info_hash {
        Some(hash) if !hash.is_empty() => DedupKey::Hash(hash.to_lowercase()),
        _ => DedupKey::TitleSize(hit.title.to_lowercase(), hit.size_bytes),
    }
}

/// Deduplicate raw hits into releases.
///
/// Hits sharing an info hash (or, hash-less, the same title + size) merge
/// into one `TorrentRelease` with one `ReleaseSource` per contributing
/// indexer. When an incoming hit has strictly more seeders than the merged
/// release, its seeder/leecher counts and download link replace the existing
/// ones (best-source-wins). Output preserves first-seen order.
pub fn deduplicate_hits(raw: Vec<RawSearchHit>) -> Vec<TorrentRelease> {
    let mut releases: Vec<TorrentRelease> = Vec::new();
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for hit in raw {
        let key = key_for(&hit);
        let source = ReleaseSource {
            indexer_id: hit.indexer_id.clone(),
            indexer: hit.indexer.clone(),
            seeders: hit.seeders,
            leechers: hit.leechers,
            download_url: hit.best_link().map(str::to_string),
        };

        match index.get(&key) {
            Some(&i) => {
                let existing = &mut releases[i];
                if !existing.sources.iter().any(|s| s.indexer == source.indexer) {
                    existing.sources.push(source);
                }
                if hit.seeders > existing.seeders {
                    existing.seeders = hit.seeders;
                    existing.leechers = hit.leechers;
                    if let Some(link) = hit.best_link() {
                        existing.download_url = Some(link.to_string());
                    }
                }
                if existing.quality.is_none() {
                    existing.quality = hit.quality;
                }
                if existing.source.is_none() {
                    existing.source = hit.source;
                }
            }
            None => {
                index.insert(key, releases.len());
                releases.push(TorrentRelease {
                    download_url: hit.best_link().map(str::to_string),
                    info_hash: hit
                        .info_hash
                        .filter(|h| !h.is_empty())
                        .map(|h| h.to_lowercase()),
                    title: hit.title,
                    size_bytes: hit.size_bytes,
                    seeders: hit.seeders,
                    leechers: hit.leechers,
                    quality: hit.quality,
                    source: hit.source,
                    sources: vec![source],
                });
            }
        }
    }

    releases
}
