//! # Settings
//!
//! Caller-owned scoring settings: decision threshold, ML weight and the
//! trusted-domain allow-list. The engine receives them by value on every call
//! and never mutates them.
//!
//! - Trusted domains are normalized (trimmed, lowercased, leading `www.` and
//!   trailing dots removed) and matched on label boundaries, so `openai.com`
//!   trusts `platform.openai.com` but not `evilopenai.com`.
//! - Out-of-range numbers are clamped to `[0.0, 1.0]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_ML_WEIGHT: f64 = 0.85;

/// Per-request scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_ml_weight")]
    pub ml_weight: f64,
    #[serde(default = "default_trusted_domains")]
    pub trusted_domains: BTreeSet<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_ml_weight() -> f64 {
    DEFAULT_ML_WEIGHT
}

fn default_trusted_domains() -> BTreeSet<String> {
    ["google.com", "openai.com", "github.com"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            ml_weight: DEFAULT_ML_WEIGHT,
            trusted_domains: default_trusted_domains(),
        }
    }
}

impl Settings {
    pub fn new<I, S>(threshold: f64, ml_weight: f64, trusted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            threshold,
            ml_weight,
            trusted_domains: trusted
                .into_iter()
                .map(|d| d.as_ref().to_string())
                .collect(),
        }
        .sanitized()
    }

    /// Clamp numbers into range and normalize the allow-list.
    pub fn sanitized(mut self) -> Self {
        self.threshold = clamp01_or(self.threshold, DEFAULT_THRESHOLD);
        self.ml_weight = clamp01_or(self.ml_weight, DEFAULT_ML_WEIGHT);
        self.trusted_domains = self
            .trusted_domains
            .iter()
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    /// Builder-style helper used by callers that manage the allow-list.
    pub fn with_trusted(mut self, domain: &str) -> Self {
        let d = normalize_domain(domain);
        if !d.is_empty() {
            self.trusted_domains.insert(d);
        }
        self
    }

    /// Return the trusted entry matching `host`, if any.
    pub fn trusted_match(&self, host: &str) -> Option<&str> {
        find_trusted(host, &self.trusted_domains)
    }
}

/// First allow-list entry that `host` equals or is a subdomain of.
pub fn find_trusted<'a>(host: &str, trusted: &'a BTreeSet<String>) -> Option<&'a str> {
    let host = normalize_domain(host);
    if host.is_empty() {
        return None;
    }
    trusted
        .iter()
        .map(String::as_str)
        .find(|td| domain_matches(&host, &normalize_domain(td)))
}

/// `host` equals `trusted` or is a subdomain of it.
pub fn domain_matches(host: &str, trusted: &str) -> bool {
    if trusted.is_empty() {
        return false;
    }
    host == trusted
        || (host.len() > trusted.len()
            && host.ends_with(trusted)
            && host.as_bytes()[host.len() - trusted.len() - 1] == b'.')
}

/// Lowercase, trim, strip a leading `www.` and trailing dots.
pub fn normalize_domain(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let trimmed = lower.trim_end_matches('.');
    trimmed
        .strip_prefix("www.")
        .unwrap_or(trimmed)
        .to_string()
}

fn clamp01_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_match_respects_label_boundary() {
        let s = Settings::default();
        assert_eq!(s.trusted_match("openai.com"), Some("openai.com"));
        assert_eq!(s.trusted_match("platform.openai.com"), Some("openai.com"));
        assert_eq!(s.trusted_match("evilopenai.com"), None);
        assert_eq!(s.trusted_match(""), None);
    }

    #[test]
    fn match_is_case_insensitive() {
        let s = Settings::default().with_trusted("Example.ORG");
        assert_eq!(s.trusted_match("WWW.EXAMPLE.org"), Some("example.org"));
    }

    #[test]
    fn sanitize_clamps_and_normalizes() {
        let s = Settings::new(1.7, f64::NAN, [" GitHub.com. ", ""]);
        assert_eq!(s.threshold, 1.0);
        assert_eq!(s.ml_weight, DEFAULT_ML_WEIGHT);
        assert_eq!(
            s.trusted_domains.iter().collect::<Vec<_>>(),
            vec!["github.com"]
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"threshold":0.7}"#).unwrap();
        assert!((s.threshold - 0.7).abs() < 1e-12);
        assert!((s.ml_weight - DEFAULT_ML_WEIGHT).abs() < 1e-12);
        assert!(s.trusted_domains.contains("openai.com"));
    }
}
