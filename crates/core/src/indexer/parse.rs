//! Quality and source tag extraction from release titles.
//!
//! Indexers rarely report structured quality fields, so the adapter derives
//! them from the title with the same alias groups the rest of the system
//! uses.

/// Resolution/quality tags in detection order (most specific first).
const QUALITY_TAGS: &[(&str, &[&str])] = &[
    ("2160p", &["2160p", "4k", "uhd"]),
    ("1080p", &["1080p", "1080i", "fhd"]),
    ("720p", &["720p"]),
    ("480p", &["480p", "sd"]),
];

/// Source tags in detection order.
const SOURCE_TAGS: &[(&str, &[&str])] = &[
    ("WEB-DL", &["web-dl", "webdl", "web dl"]),
    ("WEBRip", &["webrip", "web-rip", "web rip"]),
    ("BluRay", &["bluray", "blu-ray", "bdrip", "brrip", "remux"]),
    ("HDTV", &["hdtv"]),
    ("DVDRip", &["dvdrip", "dvd-rip", "dvd"]),
];

fn find_tag(title: &str, table: &[(&str, &[&str])]) -> Option<String> {
    let lower = title.to_lowercase();
    for (canonical, aliases) in table {
        if aliases.iter().any(|a| lower.contains(a)) {
            return Some((*canonical).to_string());
        }
    }
    None
}

/// Extract a canonical quality tag ("2160p", "1080p", ...) from a title.
pub fn parse_quality(title: &str) -> Option<String> {
    find_tag(title, QUALITY_TAGS)
}

/// Extract a canonical source tag ("WEB-DL", "BluRay", ...) from a title.
pub fn parse_source(title: &str) -> Option<String> {
    find_tag(title, SOURCE_TAGS)
}
