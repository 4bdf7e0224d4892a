//! Soft-voting ensemble over heterogeneous members.
//!
//! A member that errors or returns a non-finite / out-of-range probability is
//! recorded as 0.0 in the per-model breakdown and still counts toward the
//! weighted mean. Only when every member fails does prediction itself fail.

use std::collections::BTreeMap;

use metrics::counter;
use serde::{Deserialize, Serialize};

use super::{bayes::GaussianNb, forest::RandomForest, linear::LogisticRegression, ProbabilityModel};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{ENSEMBLE_FAILURES, MEMBER_FAILURES};

/// Concrete member variants; serialized with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GaussianNb(GaussianNb),
}

impl ProbabilityModel for Member {
    fn predict_proba(&self, x: &[f64]) -> EngineResult<f64> {
        match self {
            Member::LogisticRegression(m) => m.predict_proba(x),
            Member::RandomForest(m) => m.predict_proba(x),
            Member::GaussianNb(m) => m.predict_proba(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMember {
    pub name: String,
    pub weight: f64,
    pub model: Member,
}

/// Ensemble probability plus each member's contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub per_model: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    members: Vec<NamedMember>,
}

impl SoftVotingEnsemble {
    pub fn new(members: Vec<NamedMember>) -> EngineResult<Self> {
        if members.is_empty() {
            return Err(EngineError::Validation("ensemble needs at least one member".into()));
        }
        if members.iter().any(|m| !(m.weight.is_finite() && m.weight > 0.0)) {
            return Err(EngineError::Validation("member weights must be positive".into()));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[NamedMember] {
        &self.members
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn predict(&self, x: &[f64]) -> EngineResult<Prediction> {
        let mut per_model = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut healthy = 0usize;

        for m in &self.members {
            let p = match m.model.predict_proba(x) {
                Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => {
                    healthy += 1;
                    p
                }
                Ok(p) => {
                    tracing::warn!(target: "phishguard::model", model = %m.name, value = p, "member returned an invalid probability");
                    counter!(MEMBER_FAILURES, "model" => m.name.clone()).increment(1);
                    0.0
                }
                Err(e) => {
                    tracing::warn!(target: "phishguard::model", model = %m.name, error = %e, "member prediction failed");
                    counter!(MEMBER_FAILURES, "model" => m.name.clone()).increment(1);
                    0.0
                }
            };
            per_model.insert(m.name.clone(), p);
            weighted += m.weight * p;
            total_weight += m.weight;
        }

        if healthy == 0 || total_weight <= 0.0 {
            return Err(EngineError::ModelFault("every ensemble member failed".into()));
        }
        Ok(Prediction {
            probability: (weighted / total_weight).clamp(0.0, 1.0),
            per_model,
        })
    }

    /// Like [`predict`](Self::predict) but never fails: an aggregate failure
    /// yields probability 0.0 with an empty breakdown.
    pub fn predict_or_neutral(&self, x: &[f64]) -> Prediction {
        match self.predict(x) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(target: "phishguard::model", error = %e, "ensemble prediction failed; using neutral probability");
                counter!(ENSEMBLE_FAILURES).increment(1);
                Prediction {
                    probability: 0.0,
                    per_model: BTreeMap::new(),
                }
            }
        }
    }
}
