// src/lib.rs
// Public library surface: the detection façade plus the building blocks it is
// made of (also used directly by integration tests).

pub mod analyze;
pub mod config;
pub mod decision;
pub mod detector;
pub mod engine;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod settings;
pub mod training;

// ---- Re-exports for stable public API ----
pub use crate::config::EngineConfig;
pub use crate::decision::{InputKind, ScoreResult, TextScanReport, Verdict};
pub use crate::detector::Detector;
pub use crate::error::{EngineError, EngineResult};
pub use crate::lifecycle::{ModelLifecycle, ModelStore};
pub use crate::model::{ModelBundle, Provenance, TrainingSource};
pub use crate::settings::Settings;
pub use crate::training::TrainingParams;

/// Short anonymized id for log lines (first 6 bytes of SHA-256, hex).
/// Raw input is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
