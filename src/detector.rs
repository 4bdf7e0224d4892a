//! Detection façade.
//!
//! Ties feature extraction, heuristics, the live ensemble and the combiner
//! into one call that always yields a [`ScoreResult`], and exposes the two
//! retrain entry points.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyze::rules;
use crate::anon_hash;
use crate::config::EngineConfig;
use crate::decision::{round4, timestamp_now, InputKind, ScoreResult, TextScanReport, FILE_CONTENT_DOMAIN};
use crate::engine::{adaptive_ml_weight, combine, CombineInputs};
use crate::error::EngineResult;
use crate::features::domain_age::{age_days_or_neutral, DynAgeLookup, RdapLookup, NEUTRAL_AGE_DAYS};
use crate::features::{extract_with_age, looks_like_url, parse_url, TEXT_PLACEHOLDER_HOST};
use crate::lifecycle::{ModelLifecycle, ModelStore};
use crate::metrics::{describe_metrics, DETECTIONS, DETECT_DURATION_MS};
use crate::model::Provenance;
use crate::settings::Settings;

/// Characters of link-free document text that get scored.
pub const MAX_TEXT_SCAN_CHARS: usize = 4000;

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s)'"]+"#).unwrap());

struct AgeLookup {
    provider: DynAgeLookup,
    timeout: Duration,
}

pub struct Detector {
    lifecycle: ModelLifecycle,
    lookup: Option<AgeLookup>,
}

impl Detector {
    /// Load (or train) the model from `config` and wire the optional RDAP lookup.
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        let store = ModelStore::new(&config.model.path);
        let lifecycle = ModelLifecycle::open(store, config.training.clone())?;
        let mut detector = Self::with_lifecycle(lifecycle);

        if config.lookup.enabled {
            match RdapLookup::new(&config.lookup.endpoint, config.lookup.timeout()) {
                Ok(rdap) => detector = detector.with_lookup(Arc::new(rdap), config.lookup.timeout()),
                Err(e) => tracing::warn!(
                    target: "phishguard::lookup",
                    error = %e,
                    "domain age lookup disabled: client setup failed"
                ),
            }
        }
        Ok(detector)
    }

    pub fn with_lifecycle(lifecycle: ModelLifecycle) -> Self {
        describe_metrics();
        Self {
            lifecycle,
            lookup: None,
        }
    }

    pub fn with_lookup(mut self, provider: DynAgeLookup, timeout: Duration) -> Self {
        self.lookup = Some(AgeLookup { provider, timeout });
        self
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    /// Score one input. Performs the bounded domain-age lookup when enabled.
    pub async fn detect(&self, input: &str, settings: &Settings, threshold_override: Option<f64>) -> ScoreResult {
        let text = input.trim();
        let age = match &self.lookup {
            Some(l) if looks_like_url(text) => {
                let host = parse_url(text).host;
                age_days_or_neutral(l.provider.as_ref(), &host, l.timeout).await
            }
            _ => NEUTRAL_AGE_DAYS,
        };
        self.score_with_age(input, settings, threshold_override, age)
    }

    /// Synchronous scoring with an unknown domain age.
    pub fn score(&self, input: &str, settings: &Settings, threshold_override: Option<f64>) -> ScoreResult {
        self.score_with_age(input, settings, threshold_override, NEUTRAL_AGE_DAYS)
    }

    /// Synchronous scoring with a caller-supplied domain age (`0.0` = unknown).
    pub fn score_with_age(
        &self,
        input: &str,
        settings: &Settings,
        threshold_override: Option<f64>,
        domain_age_days: f64,
    ) -> ScoreResult {
        let started = Instant::now();
        let settings = settings.clone().sanitized();
        let text = input.trim();
        let is_url = looks_like_url(text);

        let (kind, host, domain) = if is_url {
            let host = parse_url(text).host;
            (InputKind::Url, host.clone(), host)
        } else {
            (InputKind::File, String::new(), FILE_CONTENT_DOMAIN.to_string())
        };

        let features = extract_with_age(if is_url { text } else { TEXT_PLACEHOLDER_HOST }, domain_age_days);
        // One snapshot per request; a concurrent swap cannot mix bundles.
        let bundle = self.lifecycle.current();
        let prediction = bundle.predict(&features);

        let heuristic = rules::score_with_age(text, &host, &settings.trusted_domains, domain_age_days);
        let threshold = resolve_threshold(threshold_override, settings.threshold);
        let ml_weight = adaptive_ml_weight(settings.ml_weight, heuristic.score, text.chars().count(), is_url);
        let combined = combine(CombineInputs {
            ml_probability: prediction.probability,
            heuristic_score: heuristic.score,
            ml_weight,
            trusted: heuristic.trusted,
            threshold,
        });

        let verdict = combined.verdict;
        counter!(DETECTIONS, "verdict" => verdict.as_str()).increment(1);
        histogram!(DETECT_DURATION_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            target: "phishguard::detect",
            id = %anon_hash(text),
            kind = ?kind,
            %verdict,
            final_score = combined.final_score,
            ml = prediction.probability,
            heuristic = heuristic.score,
            ml_weight,
            trusted = heuristic.trusted,
            "detection"
        );

        ScoreResult {
            input: text.to_string(),
            domain,
            kind,
            ml_probability: round4(prediction.probability),
            heuristic_score: round4(heuristic.score),
            final_score: round4(combined.final_score),
            verdict,
            threshold_used: threshold,
            trusted: heuristic.trusted,
            reasons: heuristic.reasons,
            per_model: prediction
                .per_model
                .into_iter()
                .map(|(name, p)| (name, round4(p)))
                .collect(),
            timestamp: timestamp_now(),
        }
    }

    /// Detect every distinct link in `text`; without links, score the leading
    /// text itself.
    pub async fn scan_text(&self, text: &str, settings: &Settings, threshold_override: Option<f64>) -> TextScanReport {
        let links = extract_links(text);
        let mut results = Vec::with_capacity(links.len().max(1));
        if links.is_empty() {
            let body = text.trim();
            if !body.is_empty() {
                let head: String = body.chars().take(MAX_TEXT_SCAN_CHARS).collect();
                results.push(self.detect(&head, settings, threshold_override).await);
            }
        } else {
            for link in &links {
                results.push(self.detect(link, settings, threshold_override).await);
            }
        }
        TextScanReport::from_results(links.len(), results)
    }

    /// Retrain on a fresh synthetic dataset and hot-swap the result.
    pub fn retrain(&self, sample_count: Option<usize>) -> EngineResult<bool> {
        self.lifecycle.retrain_synthetic(sample_count, None)?;
        Ok(true)
    }

    /// Retrain on a labeled CSV table and hot-swap the result. On any error
    /// the live model is unchanged.
    pub fn train_from_labeled_table(&self, path: &Path, url_column: &str, label_column: &str) -> EngineResult<bool> {
        self.lifecycle.retrain_from_table(path, url_column, label_column)?;
        Ok(true)
    }

    /// Provenance of the live bundle.
    pub fn model_info(&self) -> Provenance {
        self.lifecycle.current().provenance.clone()
    }
}

/// Override wins when finite; both are clamped to `[0, 1]`.
fn resolve_threshold(threshold_override: Option<f64>, configured: f64) -> f64 {
    threshold_override
        .filter(|t| t.is_finite())
        .unwrap_or(configured)
        .clamp(0.0, 1.0)
}

/// Distinct `http(s)://` links in first-seen order.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
