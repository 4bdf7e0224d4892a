//! Metric names, one-time descriptions and the Prometheus recorder helper.
//!
//! The library only emits through the `metrics` facade. Installing a recorder
//! is the binary's (or embedding service's) decision.

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const DETECTIONS: &str = "phishguard_detections_total";
pub const DETECT_DURATION_MS: &str = "phishguard_detect_duration_ms";
pub const MEMBER_FAILURES: &str = "phishguard_member_failures_total";
pub const ENSEMBLE_FAILURES: &str = "phishguard_ensemble_failures_total";
pub const MODEL_FALLBACKS: &str = "phishguard_model_fallbacks_total";
pub const RETRAINS: &str = "phishguard_retrains_total";
pub const RETRAIN_REJECTED: &str = "phishguard_retrain_rejected_total";
pub const MODEL_SAMPLES: &str = "phishguard_model_samples";
pub const DOMAIN_AGE_LOOKUP_FAILURES: &str = "phishguard_domain_age_lookup_failures_total";

/// One-time metrics registration (so series carry help text once exported).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!(DETECTIONS, "Detections served, labeled by verdict.");
    describe_histogram!(
        DETECT_DURATION_MS,
        Unit::Milliseconds,
        "End-to-end detection latency."
    );
    describe_counter!(
        MEMBER_FAILURES,
        "Ensemble member predictions that failed and were scored as 0."
    );
    describe_counter!(
        ENSEMBLE_FAILURES,
        "Ensemble predictions that failed entirely (neutral probability used)."
    );
    describe_counter!(
        MODEL_FALLBACKS,
        "Persisted models rejected on load and replaced by a synthetic retrain."
    );
    describe_counter!(RETRAINS, "Completed retrains, labeled by data source.");
    describe_counter!(
        RETRAIN_REJECTED,
        "Retrain requests rejected because another retrain was running."
    );
    describe_gauge!(MODEL_SAMPLES, "Sample count of the live model bundle.");
    describe_counter!(
        DOMAIN_AGE_LOOKUP_FAILURES,
        "Domain age lookups that failed or timed out."
    );
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder globally and describe all series.
    /// Fails if a recorder is already installed.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
        Ok(Self { handle })
    }

    /// Prometheus exposition text for everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
