//! False-positive elimination for subscription searches.
//!
//! Indexers match loosely: a search for "Jade Harper" happily returns titles
//! for entirely different people who merely share one word of the name. The
//! filter keeps only titles that actually contain the subscribed name (or one
//! of its aliases).

use regex_lite::Regex;
use tracing::debug;

use super::TorrentRelease;

/// Keeps releases whose titles contain the subscribed entity's name.
///
/// Single-word names match on a word boundary. Multi-word names must appear
/// in order, with at most two filler words between each adjacent pair, so
/// "Jade Nicole Harper" satisfies a "Jade Harper" subscription while
/// "Jade Kush ... Dillion Harper" does not.
pub struct NameIntegrityFilter {
    patterns: Vec<Regex>,
}

/// Escape regex metacharacters in a name fragment.
fn escape(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if !c.is_alphanumeric() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn pattern_for(name: &str) -> Option<Regex> {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let pattern = if words.len() == 1 {
        format!(r"(?i)\b{}\b", escape(words[0]))
    } else {
        // Words in order, each pair separated by at most two filler words.
        let escaped: Vec<String> = words.iter().map(|w| escape(w)).collect();
        format!(
            r"(?i)\b{}\b",
            escaped.join(r"(?:\W+\w+){0,2}\W+")
        )
    };

    Regex::new(&pattern).ok()
}

impl NameIntegrityFilter {
    /// Build the allow-list from the entity name and its aliases.
    pub fn new(names: &[String]) -> Self {
        let patterns = names
            .iter()
            .map(|n| n.to_lowercase())
            .filter_map(|n| pattern_for(&n))
            .collect();
        Self { patterns }
    }

    /// Whether a title matches any allow-list entry.
    pub fn matches(&self, title: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(title))
    }

    /// Drop releases whose titles match no allow-list entry.
    ///
    /// Eliminations are logged, never an error.
    pub fn filter(&self, releases: Vec<TorrentRelease>) -> Vec<TorrentRelease> {
        let before = releases.len();
        let kept: Vec<TorrentRelease> = releases
            .into_iter()
            .filter(|r| self.matches(&r.title))
            .collect();

        let eliminated = before - kept.len();
        if eliminated > 0 {
            debug!(eliminated, kept = kept.len(), "Name integrity filter dropped false positives");
        }

        kept
    }
}
