//! Model lifecycle: persistence with integrity header, validation on load,
//! synthetic fallback, gated retraining and atomic hot swap.
//!
//! File layout: a single header line `phishguard-model v1 <sha256-hex>`
//! followed by the JSON bundle. The checksum covers the JSON body only.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::metrics::{MODEL_FALLBACKS, MODEL_SAMPLES, RETRAINS, RETRAIN_REJECTED};
use crate::model::{ModelBundle, TrainingSource};
use crate::training::{fit_bundle, synthetic, table, TrainingParams, MIN_TRAINING_SAMPLES};

pub const MODEL_MAGIC: &str = "phishguard-model";
pub const MODEL_FORMAT_VERSION: &str = "v1";
pub const DEFAULT_MODEL_PATH: &str = "models/ensemble_model.json";

/* ----------------------------
Persistence
---------------------------- */

/// Location of the persisted bundle.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize to a sibling temp file, then rename over the target.
    pub fn save(&self, bundle: &ModelBundle) -> EngineResult<()> {
        let body = serde_json::to_string(bundle)?;
        let contents = format!(
            "{MODEL_MAGIC} {MODEL_FORMAT_VERSION} {}\n{body}",
            sha256_hex(body.as_bytes())
        );

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        tracing::info!(
            target: "phishguard::model",
            path = %self.path.display(),
            samples = bundle.provenance.sample_count,
            "model persisted"
        );
        Ok(())
    }

    /// Read, verify and validate the persisted bundle.
    pub fn load(&self) -> EngineResult<ModelBundle> {
        let raw = fs::read_to_string(&self.path)?;
        let (header, body) = raw
            .split_once('\n')
            .ok_or_else(|| EngineError::CorruptModel("missing header line".into()))?;

        let mut fields = header.split_whitespace();
        let checksum = match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(MODEL_MAGIC), Some(MODEL_FORMAT_VERSION), Some(sum), None) => sum,
            _ => {
                return Err(EngineError::CorruptModel(format!(
                    "unrecognized header '{}'",
                    header.chars().take(80).collect::<String>()
                )))
            }
        };
        if sha256_hex(body.as_bytes()) != checksum {
            return Err(EngineError::CorruptModel("checksum mismatch".into()));
        }

        let bundle: ModelBundle = serde_json::from_str(body)
            .map_err(|e| EngineError::CorruptModel(format!("invalid bundle: {e}")))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Load the persisted bundle, or train a synthetic one and persist it.
    ///
    /// Never fails because of the file's contents; a corrupted or
    /// incompatible file is logged and replaced.
    pub fn load_or_train(&self, params: &TrainingParams) -> EngineResult<ModelBundle> {
        match self.load() {
            Ok(bundle) => {
                tracing::info!(
                    target: "phishguard::model",
                    path = %self.path.display(),
                    trained_at = %bundle.provenance.trained_at,
                    "model loaded"
                );
                return Ok(bundle);
            }
            Err(EngineError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    target: "phishguard::model",
                    path = %self.path.display(),
                    "no persisted model; training a synthetic one"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "phishguard::model",
                    path = %self.path.display(),
                    error = %e,
                    "persisted model unusable; retraining"
                );
                counter!(MODEL_FALLBACKS).increment(1);
            }
        }

        let bundle = train_synthetic(params, params.synthetic_samples, params.seed)?;
        if let Err(e) = self.save(&bundle) {
            tracing::error!(
                target: "phishguard::model",
                path = %self.path.display(),
                error = %e,
                "could not persist fallback model; serving it from memory"
            );
        }
        Ok(bundle)
    }
}

/// Fit on a freshly generated synthetic dataset.
pub fn train_synthetic(params: &TrainingParams, samples: usize, seed: u64) -> EngineResult<ModelBundle> {
    let data = synthetic::generate(samples, seed);
    let params = TrainingParams {
        seed,
        ..params.clone()
    };
    fit_bundle(&data, &params, TrainingSource::Synthetic, params.validation_fraction)
}

/* ----------------------------
Live bundle + retrain gate
---------------------------- */

/// Owns the live bundle. Readers take a cheap `Arc` snapshot; retrains build
/// off-lock and swap under a short write lock. At most one retrain runs at a
/// time; a second concurrent request is rejected.
pub struct ModelLifecycle {
    store: ModelStore,
    params: TrainingParams,
    live: RwLock<Arc<ModelBundle>>,
    retrain_gate: Mutex<()>,
}

impl ModelLifecycle {
    /// Load (or fall back to training) and take ownership of the result.
    pub fn open(store: ModelStore, params: TrainingParams) -> EngineResult<Self> {
        let bundle = store.load_or_train(&params)?;
        Ok(Self::with_bundle(store, params, bundle))
    }

    pub fn with_bundle(store: ModelStore, params: TrainingParams, bundle: ModelBundle) -> Self {
        gauge!(MODEL_SAMPLES).set(bundle.provenance.sample_count as f64);
        Self {
            store,
            params,
            live: RwLock::new(Arc::new(bundle)),
            retrain_gate: Mutex::new(()),
        }
    }

    /// Snapshot of the live bundle; stays valid across a concurrent swap.
    pub fn current(&self) -> Arc<ModelBundle> {
        self.live.read().clone()
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn is_retraining(&self) -> bool {
        self.retrain_gate.is_locked()
    }

    /// Retrain on synthetic data. `samples`/`seed` default to the configured values.
    pub fn retrain_synthetic(&self, samples: Option<usize>, seed: Option<u64>) -> EngineResult<Arc<ModelBundle>> {
        let samples = samples.unwrap_or(self.params.synthetic_samples);
        if samples < MIN_TRAINING_SAMPLES {
            return Err(EngineError::InvalidInput(format!(
                "sample count must be at least {MIN_TRAINING_SAMPLES}, got {samples}"
            )));
        }
        let seed = seed.unwrap_or(self.params.seed);
        self.gated("synthetic", || train_synthetic(&self.params, samples, seed))
    }

    /// Retrain on a labeled CSV table. The live bundle is untouched on any failure.
    pub fn retrain_from_table(&self, path: &Path, url_column: &str, label_column: &str) -> EngineResult<Arc<ModelBundle>> {
        self.gated("csv", || {
            let data = table::load_labeled_table(path, url_column, label_column)?;
            fit_bundle(
                &data,
                &self.params,
                TrainingSource::Csv {
                    path: path.display().to_string(),
                },
                self.params.table_validation_fraction,
            )
        })
    }

    fn gated<F>(&self, source: &'static str, build: F) -> EngineResult<Arc<ModelBundle>>
    where
        F: FnOnce() -> EngineResult<ModelBundle>,
    {
        let Some(_guard) = self.retrain_gate.try_lock() else {
            counter!(RETRAIN_REJECTED).increment(1);
            tracing::warn!(target: "phishguard::model", source, "retrain rejected: another retrain is running");
            return Err(EngineError::RetrainInProgress);
        };

        let bundle = match build() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "phishguard::model", source, error = %e, "retrain failed; keeping current model");
                return Err(e);
            }
        };
        self.store.save(&bundle)?;

        let bundle = Arc::new(bundle);
        *self.live.write() = Arc::clone(&bundle);

        counter!(RETRAINS, "source" => source).increment(1);
        gauge!(MODEL_SAMPLES).set(bundle.provenance.sample_count as f64);
        tracing::info!(
            target: "phishguard::model",
            source,
            samples = bundle.provenance.sample_count,
            accuracy = ?bundle.provenance.validation.ensemble_accuracy,
            "model swapped"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TrainingParams {
        TrainingParams {
            synthetic_samples: 120,
            forest_trees: 4,
            forest_max_depth: 5,
            linear_epochs: 60,
            ..TrainingParams::default()
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("m/model.json"));
        let bundle = train_synthetic(&small(), 120, 5).unwrap();
        store.save(&bundle).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.ensemble, bundle.ensemble);
        assert_eq!(loaded.provenance.seed, 5);
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("phishguard-model v1 "));
    }

    #[test]
    fn tampered_body_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.json"));
        store.save(&train_synthetic(&small(), 120, 5).unwrap()).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        fs::write(store.path(), raw.replacen("\"lr\"", "\"lx\"", 1)).unwrap();
        assert!(matches!(store.load(), Err(EngineError::CorruptModel(_))));
    }

    #[test]
    fn rejected_sample_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.json"));
        let lc = ModelLifecycle::open(store, small()).unwrap();
        let err = lc.retrain_synthetic(Some(3), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn concurrent_retrain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let lc = ModelLifecycle::open(ModelStore::new(dir.path().join("model.json")), small()).unwrap();
        let before = lc.current();
        let _running = lc.retrain_gate.lock();
        assert!(lc.is_retraining());
        let err = lc.retrain_synthetic(None, None).unwrap_err();
        assert!(matches!(err, EngineError::RetrainInProgress));
        assert!(Arc::ptr_eq(&before, &lc.current()));
    }

    #[test]
    fn open_persists_fallback_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let lc = ModelLifecycle::open(ModelStore::new(&path), small()).unwrap();
        assert!(path.exists());
        assert_eq!(lc.current().provenance.source, TrainingSource::Synthetic);
        assert!(!lc.is_retraining());
    }
}
