//! Trained ensemble bundle: members, the feature schema it was trained on,
//! and provenance metadata.

pub mod bayes;
pub mod ensemble;
pub mod forest;
pub mod linear;
pub mod scaler;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::features::{schema_names, FeatureVector};

pub use ensemble::{Member, NamedMember, Prediction, SoftVotingEnsemble};

/// Anything that maps a feature row to a positive-class probability.
pub trait ProbabilityModel {
    fn predict_proba(&self, x: &[f64]) -> EngineResult<f64>;
}

/// Where a bundle's training data came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrainingSource {
    Synthetic,
    Csv { path: String },
}

impl TrainingSource {
    pub fn label(&self) -> &'static str {
        match self {
            TrainingSource::Synthetic => "synthetic",
            TrainingSource::Csv { .. } => "csv",
        }
    }
}

/// Held-out accuracy measured right after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub samples: usize,
    /// `None` when the dataset was too small to hold out any rows.
    pub ensemble_accuracy: Option<f64>,
    pub per_model: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub trained_at: DateTime<Utc>,
    pub sample_count: usize,
    pub source: TrainingSource,
    pub seed: u64,
    pub validation: ValidationReport,
}

/// Self-describing trained artifact. Immutable once built; replaced whole on
/// retrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub feature_names: Vec<String>,
    pub ensemble: SoftVotingEnsemble,
    pub provenance: Provenance,
}

impl ModelBundle {
    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        self.ensemble.predict_or_neutral(features.as_slice())
    }

    /// Schema must match the current extractor and every member must produce
    /// a probability in `[0, 1]` for a zero vector.
    pub fn validate(&self) -> EngineResult<()> {
        let expected = schema_names();
        if self.feature_names != expected {
            return Err(EngineError::SchemaMismatch {
                expected,
                found: self.feature_names.clone(),
            });
        }
        let zeros = FeatureVector::zeros();
        for m in self.ensemble.members() {
            match m.model.predict_proba(zeros.as_slice()) {
                Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => {}
                Ok(p) => {
                    return Err(EngineError::CorruptModel(format!(
                        "dummy inference of '{}' returned {p}",
                        m.name
                    )))
                }
                Err(e) => {
                    return Err(EngineError::CorruptModel(format!(
                        "dummy inference of '{}' failed: {e}",
                        m.name
                    )))
                }
            }
        }
        Ok(())
    }
}
