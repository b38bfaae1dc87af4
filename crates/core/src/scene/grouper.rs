//! Conservative clustering of normalized titles into release groups.

use std::collections::HashMap;

use crate::indexer::TorrentRelease;

use super::TitleNormalizer;

/// Titles shorter than this never merge with anything. Generic short titles
/// ("Anal", "POV") would otherwise collapse unrelated releases.
pub const MIN_GROUPABLE_LEN: usize = 15;

/// Minimum length of the shorter title for a prefix-containment merge.
pub const MIN_PREFIX_LEN: usize = 30;

/// Minimum `len(shorter) / len(longer)` for a prefix-containment merge.
pub const MIN_LEN_RATIO: f64 = 0.7;

/// A cluster of releases sharing one canonical scene title.
#[derive(Debug, Clone)]
pub struct SceneGroup {
    pub scene_title: String,
    pub torrents: Vec<TorrentRelease>,
}

/// Cluster releases under canonical scene keys.
///
/// Two phases, both intentionally conservative:
/// 1. exact equality of the normalized title;
/// 2. prefix containment, only when the shorter key is long enough
///    (`MIN_PREFIX_LEN`) and covers at least `MIN_LEN_RATIO` of the longer
///    one. The longer title becomes the canonical key.
///
/// No fuzzy similarity here; anything semantic belongs to the match engine.
pub fn group_releases(releases: Vec<TorrentRelease>, normalizer: &TitleNormalizer) -> Vec<SceneGroup> {
    let mut groups: Vec<SceneGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    // Phase 1: exact-key clustering. Short keys stay singletons and never
    // enter the index.
    for release in releases {
        let key = normalizer.normalize(&release.title);

        if key.chars().count() < MIN_GROUPABLE_LEN {
            groups.push(SceneGroup {
                scene_title: key,
                torrents: vec![release],
            });
            continue;
        }

        match index.get(&key) {
            Some(&i) => groups[i].torrents.push(release),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(SceneGroup {
                    scene_title: key,
                    torrents: vec![release],
                });
            }
        }
    }

    // Phase 2: prefix containment between groupable keys. Shorter keys are
    // absorbed into the longer group; iteration by ascending key length keeps
    // the result independent of input order.
    let mut order: Vec<usize> = (0..groups.len())
        .filter(|&i| index.contains_key(&groups[i].scene_title))
        .collect();
    order.sort_by(|&a, &b| {
        let la = groups[a].scene_title.chars().count();
        let lb = groups[b].scene_title.chars().count();
        la.cmp(&lb).then_with(|| groups[a].scene_title.cmp(&groups[b].scene_title))
    });

    let mut absorbed: Vec<bool> = vec![false; groups.len()];
    for pos in 0..order.len() {
        let short_idx = order[pos];
        if absorbed[short_idx] {
            continue;
        }
        let short_key = groups[short_idx].scene_title.clone();
        let short_len = short_key.chars().count();
        if short_len < MIN_PREFIX_LEN {
            continue;
        }

        for &long_idx in order[pos + 1..].iter() {
            if absorbed[long_idx] {
                continue;
            }
            let long_key = &groups[long_idx].scene_title;
            let long_len = long_key.chars().count();
            if long_len == short_len || !long_key.starts_with(&short_key) {
                continue;
            }
            if (short_len as f64) / (long_len as f64) < MIN_LEN_RATIO {
                continue;
            }

            let torrents = std::mem::take(&mut groups[short_idx].torrents);
            groups[long_idx].torrents.splice(0..0, torrents);
            absorbed[short_idx] = true;
            break;
        }
    }

    groups
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !absorbed[*i])
        .map(|(_, g)| g)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ReleaseSource;

    fn make_release(title: &str) -> TorrentRelease {
        TorrentRelease {
            title: title.to_string(),
            info_hash: None,
            size_bytes: 1000,
            seeders: 1,
            leechers: 0,
            quality: None,
            source: None,
            download_url: None,
            sources: vec![ReleaseSource {
                indexer_id: "i1".to_string(),
                indexer: "Alpha".to_string(),
                seeders: 1,
                leechers: 0,
                download_url: None,
            }],
        }
    }

    fn group(titles: &[&str]) -> Vec<SceneGroup> {
        let releases = titles.iter().map(|t| make_release(t)).collect();
        group_releases(releases, &TitleNormalizer::new())
    }

    #[test]
    fn test_exact_equal_keys_merge() {
        let groups = group(&[
            "A Long Enough Scene Title 1080p",
            "A Long Enough Scene Title [GRP]",
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].scene_title, "A Long Enough Scene Title");
        assert_eq!(groups[0].torrents.len(), 2);
    }

    #[test]
    fn test_short_titles_never_merge() {
        let groups = group(&["Short Clip", "Short Clip"]);

        // Identical 10-char keys, but below the groupable length: singletons.
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_prefix_merge_uses_longer_key() {
        // shorter: 33 chars, prefix of longer (40 chars), ratio 0.825
        let shorter = "An Adventurous Day At The Seaside";
        let longer = "An Adventurous Day At The Seaside Part!"; // normalizes with "Part!" kept? no digits so kept

        let groups = group(&[shorter, longer]);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].scene_title.starts_with(shorter));
        assert_eq!(groups[0].torrents.len(), 2);
    }

    #[test]
    fn test_prefix_merge_rejected_when_shorter_below_30() {
        let shorter = "A Seaside Scene Title"; // 21 chars, >= 15 so groupable
        let longer = "A Seaside Scene Title Extended"; // 30 chars

        let groups = group(&[shorter, longer]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_prefix_merge_rejected_on_low_ratio() {
        let shorter = "An Adventurous Day At The Pool"; // 30 chars
        let longer = "An Adventurous Day At The Poolside With Extra Guests And More"; // ratio < 0.7

        let groups = group(&[shorter, longer]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_grouping_is_order_independent() {
        let shorter = "An Adventurous Day At The Seaside";
        let longer = "An Adventurous Day At The Seaside Pt Two";

        let forward = group(&[shorter, longer]);
        let backward = group(&[longer, shorter]);

        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].scene_title, backward[0].scene_title);
    }

    #[test]
    fn test_unrelated_titles_stay_apart() {
        let groups = group(&[
            "An Adventurous Day At The Seaside",
            "A Completely Different Scene Entirely",
        ]);
        assert_eq!(groups.len(), 2);
    }
}
