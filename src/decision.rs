//! decision.rs — Result shapes returned to callers: verdict, input kind,
//! the per-request `ScoreResult` and the multi-link `TextScanReport`.
//!
//! All numeric scores are reported rounded to 4 decimals; the verdict is
//! computed from the unrounded score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Final classification of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Phishing,
    Suspicious,
    Legitimate,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Phishing => "phishing",
            Verdict::Suspicious => "suspicious",
            Verdict::Legitimate => "legitimate",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the input was scored as a URL or as document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Url,
    File,
}

/// Domain label reported for non-URL input.
pub const FILE_CONTENT_DOMAIN: &str = "(file content)";

/// Complete, immutable result of one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub input: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub ml_probability: f64,
    pub heuristic_score: f64,
    pub final_score: f64,
    pub verdict: Verdict,
    #[serde(rename = "threshold")]
    pub threshold_used: f64,
    pub trusted: bool,
    /// Human-readable reasons in rule order.
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Member model name → positive-class probability.
    #[serde(default)]
    pub per_model: BTreeMap<String, f64>,
    /// UTC, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
}

/// Aggregate over every link found in a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextScanReport {
    pub url_count: usize,
    pub phishing_detected: usize,
    pub total_scanned: usize,
    pub results: Vec<ScoreResult>,
    pub verdict: Verdict,
}

impl TextScanReport {
    pub fn from_results(url_count: usize, results: Vec<ScoreResult>) -> Self {
        let phishing_detected = results
            .iter()
            .filter(|r| r.verdict == Verdict::Phishing)
            .count();
        Self {
            url_count,
            phishing_detected,
            total_scanned: results.len(),
            verdict: if phishing_detected > 0 {
                Verdict::Phishing
            } else {
                Verdict::Legitimate
            },
            results,
        }
    }
}

/// Round to 4 decimals for reporting.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Current UTC time in the reporting format.
pub fn timestamp_now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
