//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of equal length. Constant columns get scale 1.0.
    pub fn fit(rows: &[&[f64]]) -> EngineResult<Self> {
        let Some(first) = rows.first() else {
            return Err(EngineError::Validation("cannot fit scaler on zero rows".into()));
        };
        let d = first.len();
        let n = rows.len() as f64;
        let mut mean = vec![0.0; d];
        for r in rows {
            for (m, x) in mean.iter_mut().zip(r.iter()) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; d];
        for r in rows {
            for ((v, x), m) in var.iter_mut().zip(r.iter()).zip(mean.iter()) {
                *v += (x - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let sd = (v / n).sqrt();
                if sd > 1e-12 {
                    sd
                } else {
                    1.0
                }
            })
            .collect();
        Ok(Self { mean, scale })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> EngineResult<Vec<f64>> {
        if x.len() != self.dim() {
            return Err(EngineError::ModelFault(format!(
                "scaler expects {} features, got {}",
                self.dim(),
                x.len()
            )));
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}
