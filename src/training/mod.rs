//! Fitting procedure shared by the synthetic and labeled-table paths.
//!
//! `fit_bundle` validates the dataset, performs a seeded stratified split,
//! fits the three members in a fixed order (`lr`, `rf`, `nb`) and records
//! held-out accuracy in the bundle's provenance.

pub mod synthetic;
pub mod table;

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::features::{schema_names, FeatureVector};
use crate::model::{
    bayes::GaussianNb, forest::RandomForest, linear::LogisticRegression, Member, ModelBundle,
    NamedMember, ProbabilityModel, Provenance, SoftVotingEnsemble, TrainingSource,
    ValidationReport,
};

/// Smallest dataset a retrain accepts.
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// Hyper-parameters and dataset knobs. Deserialized from `[training]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub synthetic_samples: usize,
    pub seed: u64,
    pub validation_fraction: f64,
    pub table_validation_fraction: f64,
    pub forest_trees: usize,
    pub forest_max_depth: usize,
    pub linear_epochs: usize,
    pub linear_learning_rate: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            synthetic_samples: 2000,
            seed: 42,
            validation_fraction: 0.2,
            table_validation_fraction: 0.15,
            forest_trees: 100,
            forest_max_depth: 12,
            linear_epochs: 400,
            linear_learning_rate: 0.1,
        }
    }
}

impl TrainingParams {
    /// Clamp out-of-range values instead of failing.
    pub fn sanitized(mut self) -> Self {
        self.synthetic_samples = self.synthetic_samples.max(MIN_TRAINING_SAMPLES);
        self.validation_fraction = clamp_fraction(self.validation_fraction, 0.2);
        self.table_validation_fraction = clamp_fraction(self.table_validation_fraction, 0.15);
        self.forest_trees = self.forest_trees.max(1);
        self.forest_max_depth = self.forest_max_depth.max(1);
        self.linear_epochs = self.linear_epochs.max(1);
        if !(self.linear_learning_rate.is_finite() && self.linear_learning_rate > 0.0) {
            self.linear_learning_rate = 0.1;
        }
        self
    }
}

fn clamp_fraction(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 0.5)
    } else {
        fallback
    }
}

/// Labeled feature rows. Label 1 = phishing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<FeatureVector>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn push(&mut self, row: FeatureVector, label: u8) {
        self.rows.push(row);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn class_counts(&self) -> [usize; 2] {
        let pos = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - pos, pos]
    }

    fn subset(&self, idx: &[usize]) -> Dataset {
        Dataset {
            rows: idx.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: idx.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    fn row_refs(&self) -> Vec<&[f64]> {
        self.rows.iter().map(FeatureVector::as_slice).collect()
    }
}

/// Reject datasets no member could learn from.
pub fn validate_dataset(data: &Dataset) -> EngineResult<()> {
    if data.rows.len() != data.labels.len() {
        return Err(EngineError::Validation("rows and labels differ in length".into()));
    }
    if data.len() < MIN_TRAINING_SAMPLES {
        return Err(EngineError::Validation(format!(
            "need at least {MIN_TRAINING_SAMPLES} samples, got {}",
            data.len()
        )));
    }
    let [neg, pos] = data.class_counts();
    if neg == 0 || pos == 0 {
        return Err(EngineError::Validation(format!(
            "both classes must be present (legitimate={neg}, phishing={pos})"
        )));
    }
    Ok(())
}

/// Seeded split that keeps the label ratio in both halves. Each class keeps at
/// least one training row.
pub fn stratified_split(data: &Dataset, validation_fraction: f64, seed: u64) -> (Dataset, Dataset) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut val_idx = Vec::new();
    for class in [0u8, 1u8] {
        let mut idx: Vec<usize> = (0..data.len()).filter(|&i| data.labels[i] == class).collect();
        idx.shuffle(&mut rng);
        let n_val = ((idx.len() as f64) * validation_fraction).round() as usize;
        let n_val = n_val.min(idx.len().saturating_sub(1));
        val_idx.extend_from_slice(&idx[..n_val]);
        train_idx.extend_from_slice(&idx[n_val..]);
    }
    train_idx.sort_unstable();
    val_idx.sort_unstable();
    (data.subset(&train_idx), data.subset(&val_idx))
}

/// Fit every member and assemble a bundle with provenance.
pub fn fit_bundle(
    data: &Dataset,
    params: &TrainingParams,
    source: TrainingSource,
    validation_fraction: f64,
) -> EngineResult<ModelBundle> {
    validate_dataset(data)?;
    let (train, val) = stratified_split(data, validation_fraction, params.seed);
    let rows = train.row_refs();

    tracing::info!(
        target: "phishguard::training",
        source = source.label(),
        train = train.len(),
        validation = val.len(),
        seed = params.seed,
        "fitting ensemble"
    );

    let members = vec![
        NamedMember {
            name: "lr".into(),
            weight: 1.0,
            model: Member::LogisticRegression(LogisticRegression::fit(
                &rows,
                &train.labels,
                params.linear_epochs,
                params.linear_learning_rate,
            )?),
        },
        NamedMember {
            name: "rf".into(),
            weight: 1.0,
            model: Member::RandomForest(RandomForest::fit(
                &rows,
                &train.labels,
                params.forest_trees,
                params.forest_max_depth,
                params.seed,
            )?),
        },
        NamedMember {
            name: "nb".into(),
            weight: 1.0,
            model: Member::GaussianNb(GaussianNb::fit(&rows, &train.labels)?),
        },
    ];
    let ensemble = SoftVotingEnsemble::new(members)?;
    let validation = evaluate(&ensemble, &val);

    tracing::info!(
        target: "phishguard::training",
        accuracy = ?validation.ensemble_accuracy,
        "ensemble fitted"
    );

    Ok(ModelBundle {
        feature_names: schema_names(),
        ensemble,
        provenance: Provenance {
            trained_at: chrono::Utc::now(),
            sample_count: data.len(),
            source,
            seed: params.seed,
            validation,
        },
    })
}

/// Accuracy at the 0.5 cut, per member and for the ensemble.
pub fn evaluate(ensemble: &SoftVotingEnsemble, val: &Dataset) -> ValidationReport {
    if val.is_empty() {
        return ValidationReport::default();
    }
    let n = val.len() as f64;
    let mut per_model = BTreeMap::new();
    for m in ensemble.members() {
        let correct = val
            .rows
            .iter()
            .zip(&val.labels)
            .filter(|(x, y)| {
                m.model
                    .predict_proba(x.as_slice())
                    .is_ok_and(|p| u8::from(p >= 0.5) == **y)
            })
            .count();
        per_model.insert(m.name.clone(), correct as f64 / n);
    }
    let correct = val
        .rows
        .iter()
        .zip(&val.labels)
        .filter(|(x, y)| {
            ensemble
                .predict(x.as_slice())
                .is_ok_and(|p| u8::from(p.probability >= 0.5) == **y)
        })
        .count();
    ValidationReport {
        samples: val.len(),
        ensemble_accuracy: Some(correct as f64 / n),
        per_model,
    }
}
