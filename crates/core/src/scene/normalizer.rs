//! Title normalization into canonical scene keys.
//!
//! Indexer titles bury the actual scene name under site prefixes, quality
//! tags, dates, spam and release-group noise. The normalizer strips all of
//! that with an ordered rule table; later rules assume earlier ones already
//! ran, so table order is part of the contract.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// A single named cleaning rule.
pub struct CleanRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl CleanRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("invalid clean rule pattern"),
            replacement,
        }
    }

    fn apply(&self, input: &str) -> String {
        self.pattern.replace_all(input, self.replacement).into_owned()
    }
}

/// Default rule table, in execution order.
static DEFAULT_RULES: Lazy<Vec<CleanRule>> = Lazy::new(|| {
    vec![
        CleanRule::new(
            "spam",
            r"(?i)(?:https?://\S+|www\.\S+|t\.me/\S+|telegram[\s:@]+\S+|join\s+(?:our\s+)?(?:telegram|discord)\S*|free\s+download|watch\s+online)",
            " ",
        ),
        CleanRule::new(
            "site_prefix",
            r"(?i)^\s*(?:[a-z0-9-]+\.(?:com|net|org|xxx|tv|to|me|cc)\b[\s._\-]*)+",
            "",
        ),
        CleanRule::new(
            "platform_prefix",
            r"(?i)^\s*(?:onlyfans|manyvids|fansly|clips4sale|modelhub)\b[\s._-]*",
            "",
        ),
        CleanRule::new(
            "marketing",
            r"(?i)\b(?:exclusive|must\s*see|watch\s*now|requested|premium|new\s+release)\b",
            " ",
        ),
        CleanRule::new(
            "date_iso",
            r"\b(?:19|20)\d{2}[-._ ](?:0?\d|1[0-2])[-._ ](?:[0-2]?\d|3[01])\b",
            " ",
        ),
        CleanRule::new(
            "date_dmy",
            r"\b(?:[0-2]?\d|3[01])[-._ ](?:0?\d|1[0-2])[-._ ](?:19|20)\d{2}\b",
            " ",
        ),
        CleanRule::new("date_short", r"\b\d{2}[-._ ]\d{2}[-._ ]\d{2}\b", " "),
        CleanRule::new(
            "date_month_name",
            r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s*(?:19|20)?\d{2}\b",
            " ",
        ),
        CleanRule::new(
            "quality_tokens",
            r"(?i)\b(?:2160p|1080p|1080i|720p|480p|4k|uhd|fhd|web[-_. ]?dl|web[-_. ]?rip|blu[-_. ]?ray|bdrip|brrip|hdtv|dvdrip|dvd|remux|x26[45]|h[-_. ]?26[45]|hevc|avc|av1|xvid|aac(?:2[.,]0)?|ac3|dd5[.,]1|dts|atmos|mp4|mkv|avi|wmv|mov|hd)\b",
            " ",
        ),
        CleanRule::new("bracket_tags", r"\[[^\]]*\]|\{[^}]*\}", " "),
        CleanRule::new("size_tokens", r"(?i)\b\d+(?:[.,]\d+)?\s*(?:gib|gb|mib|mb|kb)\b", " "),
        CleanRule::new(
            "episode_tokens",
            r"(?i)\b(?:s\d{1,2}[\s._-]*e\d{1,3}|e\d{2,3}|episode\s*\d+|ep\.?\s*\d+|part\s*\d+|scene\s*\d+|vol(?:ume)?\.?\s*\d+)\b",
            " ",
        ),
        CleanRule::new(
            "release_tags",
            r"(?i)\b(?:proper|repack|rerip|internal|limited|remastered|readnfo|multi)\b",
            " ",
        ),
        CleanRule::new("repeated_punctuation", r"[-_.,!?:;|]{2,}", " "),
        CleanRule::new("whitespace", r"\s{2,}", " "),
    ]
});

/// Strips noise tokens from release titles to produce canonical scene keys.
pub struct TitleNormalizer {
    rules: &'static [CleanRule],
}

impl TitleNormalizer {
    /// Normalizer with the default rule table.
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.as_slice(),
        }
    }

    /// Apply all rules in order and trim separators.
    ///
    /// The key must never be empty: a title that cleans down to nothing is
    /// returned unmodified.
    pub fn normalize(&self, title: &str) -> String {
        let mut current = title.to_string();
        for rule in self.rules {
            current = rule.apply(&current);
        }

        let cleaned = current
            .trim_matches(|c: char| c.is_whitespace() || "-_.,:;|".contains(c))
            .to_string();

        if cleaned.is_empty() {
            title.to_string()
        } else {
            cleaned
        }
    }

    /// Names of the active rules, in execution order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

impl Default for TitleNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
