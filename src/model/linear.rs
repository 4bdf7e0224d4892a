//! Logistic regression on standardized features, fitted by batch gradient
//! descent with L2 regularization.

use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use crate::error::{EngineError, EngineResult};

const L2: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    scaler: StandardScaler,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    pub fn fit(rows: &[&[f64]], labels: &[u8], epochs: usize, learning_rate: f64) -> EngineResult<Self> {
        if rows.len() != labels.len() || rows.is_empty() {
            return Err(EngineError::Validation(
                "logistic regression needs matching, non-empty rows and labels".into(),
            ));
        }
        let scaler = StandardScaler::fit(rows)?;
        let xs = rows
            .iter()
            .map(|r| scaler.transform(r))
            .collect::<EngineResult<Vec<_>>>()?;
        let d = scaler.dim();
        let n = xs.len() as f64;

        let mut weights = vec![0.0; d];
        let mut bias = 0.0;
        let mut grad = vec![0.0; d];
        for _ in 0..epochs {
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;
            for (x, &y) in xs.iter().zip(labels) {
                let err = sigmoid(dot(&weights, x) + bias) - f64::from(y);
                for (g, xi) in grad.iter_mut().zip(x) {
                    *g += err * xi;
                }
                grad_b += err;
            }
            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= learning_rate * (g / n + L2 * *w);
            }
            bias -= learning_rate * grad_b / n;
        }

        Ok(Self {
            scaler,
            weights,
            bias,
        })
    }

    pub fn predict_proba(&self, x: &[f64]) -> EngineResult<f64> {
        let z = self.scaler.transform(x)?;
        Ok(sigmoid(dot(&self.weights, &z) + self.bias))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_linearly_separable_data() {
        let data: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 1.0]).collect();
        let rows: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i >= 20)).collect();
        let m = LogisticRegression::fit(&rows, &labels, 300, 0.5).unwrap();
        assert!(m.predict_proba(&[35.0, 1.0]).unwrap() > 0.9);
        assert!(m.predict_proba(&[2.0, 1.0]).unwrap() < 0.1);
    }

    #[test]
    fn sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}
