//! Type definitions for Threat Sentry
//! All core data structures for IOC analysis

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::errors::{AppError, AppResult};

/// Kind of indicator of compromise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IocType {
    Ip,
    Domain,
    Hash,
    Url,
}

impl IocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IocType::Ip => "ip",
            IocType::Domain => "domain",
            IocType::Hash => "hash",
            IocType::Url => "url",
        }
    }
}

impl fmt::Display for IocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IocType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ip" => Ok(IocType::Ip),
            "domain" => Ok(IocType::Domain),
            "hash" => Ok(IocType::Hash),
            "url" => Ok(IocType::Url),
            other => Err(AppError::unsupported_type(other)),
        }
    }
}

/// Threat level classification, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Map a 0-100 threat score onto a level
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => ThreatLevel::Critical,
            60..=79 => ThreatLevel::High,
            40..=59 => ThreatLevel::Medium,
            20..=39 => ThreatLevel::Low,
            _ => ThreatLevel::Info,
        }
    }

    /// Levels above low count as a detected threat
    pub fn is_threat(&self) -> bool {
        *self >= ThreatLevel::Medium
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Info => "info",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ThreatLevel::Info => "✅",
            ThreatLevel::Low => "🟡",
            ThreatLevel::Medium => "🟠",
            ThreatLevel::High => "🔴",
            ThreatLevel::Critical => "💀",
        }
    }
}

/// How much the sources agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Two or more detecting sources is HIGH, one is MEDIUM
    pub fn from_detections(detecting_sources: usize) -> Self {
        match detecting_sources {
            0 => Confidence::Low,
            1 => Confidence::Medium,
            _ => Confidence::High,
        }
    }
}

/// Verdict of a single threat-intel source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatSource {
    pub name: String,
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ThreatSource {
    /// A source that has nothing to report, with a reason
    pub fn undetected(name: &str, details: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            detected: false,
            score: None,
            details: Some(details.into()),
            last_seen: None,
            categories: Vec::new(),
        }
    }
}

/// IP geolocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub country: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// A validated, normalized indicator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub value: String,
    pub kind: IocType,
}

impl Indicator {
    /// Validate `value` against `kind` and normalize it to lowercase
    pub fn parse(value: &str, kind: IocType) -> AppResult<Self> {
        let mut value = value.trim().to_lowercase();
        // "example.com." and "example.com" are the same domain
        if kind == IocType::Domain && value.ends_with('.') {
            value.pop();
        }
        if value.is_empty() {
            return Err(AppError::invalid_indicator("Indicator value is empty"));
        }

        let valid = match kind {
            IocType::Ip => value.parse::<IpAddr>().is_ok(),
            IocType::Domain => is_valid_domain(&value),
            IocType::Hash => is_valid_hash(&value),
            IocType::Url => is_valid_url(&value),
        };

        if !valid {
            return Err(AppError::invalid_indicator(format!(
                "{:?} is not a valid {}",
                value, kind
            )));
        }

        Ok(Self { value, kind })
    }

    /// Store key: one record per (type, value)
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.value)
    }

    /// True for IPv6 literals (OTX uses a separate section for them)
    pub fn is_ipv6(&self) -> bool {
        matches!(self.value.parse::<IpAddr>(), Ok(IpAddr::V6(_)))
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.kind)
    }
}

/// Dot-separated labels of `[a-z0-9-]`, no leading or trailing hyphen
fn is_valid_domain(value: &str) -> bool {
    if value.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = value.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// MD5, SHA-1 or SHA-256 in hex
fn is_valid_hash(value: &str) -> bool {
    matches!(value.len(), 32 | 40 | 64) && hex::decode(value).is_ok()
}

fn is_valid_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Output of one aggregation run, before it is stored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub value: String,
    #[serde(rename = "type")]
    pub ioc_type: IocType,
    pub threat_score: u8,
    pub threat_level: ThreatLevel,
    pub confidence: Confidence,
    pub sources: Vec<ThreatSource>,
    pub geo: Option<GeoLocation>,
    pub tags: Vec<String>,
    pub pulse_count: u64,
    pub malware_families: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Stored aggregation for one (value, type) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IocRecord {
    pub id: String,
    pub value: String,
    #[serde(rename = "type")]
    pub ioc_type: IocType,
    pub threat_score: u8,
    pub threat_level: ThreatLevel,
    pub confidence: Confidence,
    pub sources: Vec<ThreatSource>,
    pub geo: Option<GeoLocation>,
    pub tags: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub pulse_count: u64,
    #[serde(default)]
    pub malware_families: Vec<String>,
}

impl IocRecord {
    /// Build a record from a report, reusing identity from a previous one
    pub fn from_report(report: AnalysisReport, previous: Option<&IocRecord>) -> Self {
        let (id, first_seen) = match previous {
            Some(prev) => (prev.id.clone(), prev.first_seen),
            None => (uuid::Uuid::new_v4().to_string(), report.analyzed_at),
        };

        Self {
            id,
            value: report.value,
            ioc_type: report.ioc_type,
            threat_score: report.threat_score,
            threat_level: report.threat_level,
            confidence: report.confidence,
            sources: report.sources,
            geo: report.geo,
            tags: report.tags,
            first_seen,
            last_seen: report.analyzed_at,
            pulse_count: report.pulse_count,
            malware_families: report.malware_families,
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.ioc_type, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioc_type_from_str() {
        assert_eq!("IP".parse::<IocType>().unwrap(), IocType::Ip);
        assert_eq!(" hash ".parse::<IocType>().unwrap(), IocType::Hash);
        assert!("email".parse::<IocType>().is_err());
    }

    #[test]
    fn test_threat_level_thresholds() {
        assert_eq!(ThreatLevel::from_score(0), ThreatLevel::Info);
        assert_eq!(ThreatLevel::from_score(19), ThreatLevel::Info);
        assert_eq!(ThreatLevel::from_score(20), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_score(40), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_score(60), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_score(79), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_score(80), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_score(100), ThreatLevel::Critical);
    }

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::Info < ThreatLevel::Low);
        assert!(ThreatLevel::High < ThreatLevel::Critical);
        assert!(!ThreatLevel::Low.is_threat());
        assert!(ThreatLevel::Medium.is_threat());
    }

    #[test]
    fn test_confidence() {
        assert_eq!(Confidence::from_detections(0), Confidence::Low);
        assert_eq!(Confidence::from_detections(1), Confidence::Medium);
        assert_eq!(Confidence::from_detections(3), Confidence::High);
    }

    #[test]
    fn test_indicator_normalization() {
        let ioc = Indicator::parse("  Evil.EXAMPLE.com ", IocType::Domain).unwrap();
        assert_eq!(ioc.value, "evil.example.com");
        assert_eq!(ioc.key(), "domain:evil.example.com");

        let rooted = Indicator::parse("Evil.Example.com.", IocType::Domain).unwrap();
        assert_eq!(rooted.key(), ioc.key());
    }

    #[test]
    fn test_indicator_validation() {
        assert!(Indicator::parse("8.8.8.8", IocType::Ip).is_ok());
        assert!(Indicator::parse("2001:db8::1", IocType::Ip).unwrap().is_ipv6());
        assert!(Indicator::parse("999.1.1.1", IocType::Ip).is_err());
        assert!(Indicator::parse("localhost", IocType::Domain).is_err());
        assert!(Indicator::parse("-bad.com", IocType::Domain).is_err());
        assert!(Indicator::parse("bad_label.example.com", IocType::Domain).is_err());
        assert!(Indicator::parse("example..com", IocType::Domain).is_err());
        assert!(Indicator::parse("example.com..", IocType::Domain).is_err());
        assert!(Indicator::parse(".", IocType::Domain).is_err());
        assert!(Indicator::parse("d41d8cd98f00b204e9800998ecf8427e", IocType::Hash).is_ok());
        assert!(Indicator::parse("d41d8cd98f00b204e9800998ecf8427", IocType::Hash).is_err());
        assert!(Indicator::parse("zz1d8cd98f00b204e9800998ecf8427e", IocType::Hash).is_err());
        assert!(Indicator::parse("https://evil.example.com/payload", IocType::Url).is_ok());
        assert!(Indicator::parse("ftp://evil.example.com", IocType::Url).is_err());
        assert!(Indicator::parse("   ", IocType::Ip).is_err());
    }

    #[test]
    fn test_record_wire_shape() {
        let report = AnalysisReport {
            value: "1.2.3.4".to_string(),
            ioc_type: IocType::Ip,
            threat_score: 45,
            threat_level: ThreatLevel::Medium,
            confidence: Confidence::Medium,
            sources: vec![ThreatSource::undetected("VirusTotal", "0/90 engines detected")],
            geo: None,
            tags: vec![],
            pulse_count: 0,
            malware_families: vec![],
            analyzed_at: Utc::now(),
        };
        let record = IocRecord::from_report(report, None);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "ip");
        assert_eq!(json["threatLevel"], "medium");
        assert_eq!(json["confidence"], "MEDIUM");
        assert_eq!(json["threatScore"], 45);
        assert!(json["geo"].is_null());
        assert_eq!(json["sources"][0]["details"], "0/90 engines detected");
        assert_eq!(record.first_seen, record.last_seen);
    }
}
