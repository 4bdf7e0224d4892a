//! Gaussian naive Bayes evaluated in log space.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Fraction of the largest feature variance added to every variance.
const VAR_SMOOTHING: f64 = 1e-9;
const VAR_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    log_prior: [f64; 2],
    mean: [Vec<f64>; 2],
    var: [Vec<f64>; 2],
}

impl GaussianNb {
    pub fn fit(rows: &[&[f64]], labels: &[u8]) -> EngineResult<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(EngineError::Validation(
                "naive Bayes needs matching, non-empty rows and labels".into(),
            ));
        }
        let d = rows[0].len();
        let mut count = [0usize; 2];
        let mut mean = [vec![0.0; d], vec![0.0; d]];
        for (r, &y) in rows.iter().zip(labels) {
            let c = usize::from(y.min(1));
            count[c] += 1;
            for (m, x) in mean[c].iter_mut().zip(r.iter()) {
                *m += x;
            }
        }
        if count.contains(&0) {
            return Err(EngineError::Validation(
                "naive Bayes needs samples of both classes".into(),
            ));
        }
        for c in 0..2 {
            mean[c].iter_mut().for_each(|m| *m /= count[c] as f64);
        }

        let mut var = [vec![0.0; d], vec![0.0; d]];
        for (r, &y) in rows.iter().zip(labels) {
            let c = usize::from(y.min(1));
            for ((v, x), m) in var[c].iter_mut().zip(r.iter()).zip(mean[c].iter()) {
                *v += (x - m).powi(2);
            }
        }
        for c in 0..2 {
            var[c].iter_mut().for_each(|v| *v /= count[c] as f64);
        }

        let max_var = overall_max_variance(rows);
        let eps = (VAR_SMOOTHING * max_var).max(VAR_FLOOR);
        for v in var.iter_mut().flat_map(|v| v.iter_mut()) {
            *v += eps;
        }

        let n = rows.len() as f64;
        Ok(Self {
            log_prior: [
                (count[0] as f64 / n).ln(),
                (count[1] as f64 / n).ln(),
            ],
            mean,
            var,
        })
    }

    pub fn predict_proba(&self, x: &[f64]) -> EngineResult<f64> {
        if x.len() != self.mean[0].len() {
            return Err(EngineError::ModelFault(format!(
                "naive Bayes expects {} features, got {}",
                self.mean[0].len(),
                x.len()
            )));
        }
        let lj0 = self.log_joint(0, x);
        let lj1 = self.log_joint(1, x);
        let p = 1.0 / (1.0 + (lj0 - lj1).exp());
        if p.is_finite() {
            Ok(p)
        } else {
            Err(EngineError::ModelFault("naive Bayes produced a non-finite probability".into()))
        }
    }

    fn log_joint(&self, c: usize, x: &[f64]) -> f64 {
        let ll: f64 = x
            .iter()
            .zip(self.mean[c].iter().zip(self.var[c].iter()))
            .map(|(x, (m, v))| -0.5 * (2.0 * std::f64::consts::PI * v).ln() - (x - m).powi(2) / (2.0 * v))
            .sum();
        self.log_prior[c] + ll
    }
}

fn overall_max_variance(rows: &[&[f64]]) -> f64 {
    let d = rows[0].len();
    let n = rows.len() as f64;
    (0..d)
        .map(|j| {
            let m = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            rows.iter().map(|r| (r[j] - m).powi(2)).sum::<f64>() / n
        })
        .fold(0.0, f64::max)
}
