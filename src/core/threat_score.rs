//! Threat Scoring Module
//! Folds per-source verdicts into one 0-100 score, a level and a confidence
//!
//! - Detecting sources contribute their own score, or a fixed weight when
//!   they report none (OTX).
//! - The sum is averaged over every queried source, detecting or not.

use serde::Serialize;

use crate::models::{Confidence, ThreatLevel, ThreatSource};
use crate::utils::constants::{DEFAULT_DETECTION_WEIGHT, MALICIOUS_TAG, MAX_TAGS};

/// Aggregated verdict over all sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatScore {
    /// Overall score (0-100)
    pub total: u8,
    pub level: ThreatLevel,
    pub confidence: Confidence,
    /// Number of sources that flagged the indicator
    pub detections: usize,
    /// Normalized tags derived from source categories
    pub tags: Vec<String>,
}

impl ThreatScore {
    /// Score an ordered list of source verdicts
    pub fn calculate(sources: &[ThreatSource]) -> Self {
        let detecting: Vec<&ThreatSource> = sources.iter().filter(|s| s.detected).collect();

        let sum: u32 = detecting
            .iter()
            .map(|s| s.score.unwrap_or(DEFAULT_DETECTION_WEIGHT))
            .sum();

        let average = sum as f64 / sources.len().max(1) as f64;
        let total = average.round().min(100.0) as u8;

        let level = ThreatLevel::from_score(total);
        let confidence = Confidence::from_detections(detecting.len());
        let tags = Self::generate_tags(sources, level);

        Self {
            total,
            level,
            confidence,
            detections: detecting.len(),
            tags,
        }
    }

    /// Lowercased, hyphenated, deduplicated, at most five
    fn generate_tags(sources: &[ThreatSource], level: ThreatLevel) -> Vec<String> {
        let mut raw: Vec<&str> = sources
            .iter()
            .flat_map(|s| s.categories.iter().map(String::as_str))
            .collect();
        if level >= ThreatLevel::High {
            raw.push(MALICIOUS_TAG);
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in raw.into_iter().map(normalize_tag) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags.truncate(MAX_TAGS);
        tags
    }

    /// Summary line for logs
    pub fn summary(&self) -> String {
        format!(
            "{} {} score {} ({:?} confidence, {} detections)",
            self.level.emoji(),
            self.level.as_str().to_uppercase(),
            self.total,
            self.confidence,
            self.detections
        )
    }
}

/// Lowercase, each whitespace run becomes one `-` (edges included)
fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut in_space = false;
    for c in tag.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.extend(c.to_lowercase());
            in_space = false;
        }
    }
    out
}

/// Builder for creating threat scores source by source
pub struct ThreatScoreBuilder {
    sources: Vec<ThreatSource>,
}

impl ThreatScoreBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Add one source verdict (order is kept)
    pub fn with_source(mut self, source: ThreatSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add an optional verdict, skipping sources that were not queried
    pub fn with_optional_source(self, source: Option<ThreatSource>) -> Self {
        match source {
            Some(source) => self.with_source(source),
            None => self,
        }
    }

    /// Build the final score, returning the sources alongside it
    pub fn build(self) -> (ThreatScore, Vec<ThreatSource>) {
        let score = ThreatScore::calculate(&self.sources);
        (score, self.sources)
    }
}

impl Default for ThreatScoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(name: &str, score: Option<u32>, categories: &[&str]) -> ThreatSource {
        ThreatSource {
            name: name.to_string(),
            detected: true,
            score,
            details: None,
            last_seen: None,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn clean(name: &str) -> ThreatSource {
        ThreatSource::undetected(name, "clean")
    }

    #[test]
    fn test_no_sources() {
        let score = ThreatScore::calculate(&[]);
        assert_eq!(score.total, 0);
        assert_eq!(score.level, ThreatLevel::Info);
        assert_eq!(score.confidence, Confidence::Low);
        assert!(score.tags.is_empty());
    }

    #[test]
    fn test_average_over_all_sources() {
        // (90 + 30) / 3 = 40
        let (score, sources) = ThreatScoreBuilder::new()
            .with_source(detected("AbuseIPDB", Some(90), &[]))
            .with_source(clean("VirusTotal"))
            .with_source(detected("AlienVault OTX", None, &[]))
            .build();

        assert_eq!(sources.len(), 3);
        assert_eq!(score.total, 40);
        assert_eq!(score.level, ThreatLevel::Medium);
        assert_eq!(score.confidence, Confidence::High);
        assert_eq!(score.detections, 2);
    }

    #[test]
    fn test_rounding() {
        // 5 / 2 = 2.5 -> 3
        let score = ThreatScore::calculate(&[detected("VirusTotal", Some(5), &[]), clean("OTX")]);
        assert_eq!(score.total, 3);
        assert_eq!(score.confidence, Confidence::Medium);
    }

    #[test]
    fn test_capped_at_100() {
        let score = ThreatScore::calculate(&[detected("VirusTotal", Some(250), &[])]);
        assert_eq!(score.total, 100);
        assert_eq!(score.level, ThreatLevel::Critical);
    }

    #[test]
    fn test_zero_score_detection_counts_for_confidence() {
        let score = ThreatScore::calculate(&[detected("X", Some(0), &[]), clean("Y")]);
        assert_eq!(score.total, 0);
        assert_eq!(score.confidence, Confidence::Medium);
    }

    #[test]
    fn test_tags_normalized_and_limited() {
        let sources = vec![
            detected("AbuseIPDB", Some(100), &["Data Center/Web  Hosting"]),
            detected(
                "AlienVault OTX",
                None,
                &["Emotet C2", "emotet   c2", "Phishing", "Botnet", "Scanner", "Tor Exit"],
            ),
        ];
        let score = ThreatScore::calculate(&sources);

        assert_eq!(score.level, ThreatLevel::High);
        assert_eq!(
            score.tags,
            vec!["data-center/web-hosting", "emotet-c2", "phishing", "botnet", "scanner"]
        );
    }

    #[test]
    fn test_normalize_tag_keeps_edge_whitespace_as_hyphen() {
        assert_eq!(normalize_tag("Emotet   C2"), "emotet-c2");
        assert_eq!(normalize_tag(" Tor Exit "), "-tor-exit-");
        assert_eq!(normalize_tag("Tor\tExit\n"), "tor-exit-");
        assert_ne!(normalize_tag(" Tor Exit"), normalize_tag("Tor Exit"));
    }

    #[test]
    fn test_malicious_tag_only_for_high_and_critical() {
        let high = ThreatScore::calculate(&[detected("AbuseIPDB", Some(75), &[])]);
        assert_eq!(high.tags, vec!["malicious"]);

        let medium = ThreatScore::calculate(&[detected("AbuseIPDB", Some(45), &[])]);
        assert!(medium.tags.is_empty());
    }
}
