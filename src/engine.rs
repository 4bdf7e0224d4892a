//! # Score Combiner
//! Pure, testable logic that maps `(ml_probability, heuristic_score, settings)`
//! → `(final_score, verdict)`. No I/O.
//!
//! Policy: weighted blend of model probability and heuristic score. Trusted
//! domains are dampened by a fixed factor; when the heuristics fire hard or the
//! input does not look like the URLs the model was trained on, the blend leans
//! toward the heuristics.

use serde::Serialize;

use crate::decision::Verdict;

/// Multiplier applied to the final score of trusted domains.
pub const TRUST_DAMPENING: f64 = 0.3;
/// Fraction of the threshold at which a score becomes `suspicious`.
pub const SUSPICIOUS_RATIO: f64 = 0.6;
/// Upper bound on the ML weight when the model is likely out of distribution.
pub const ADAPTIVE_ML_WEIGHT: f64 = 0.5;
/// Heuristic score at or above which the blend leans toward heuristics.
pub const HIGH_HEURISTIC: f64 = 0.7;
/// Input length (chars) above which the blend leans toward heuristics.
pub const LONG_INPUT_CHARS: usize = 200;

/// Inputs to a single combination step.
#[derive(Clone, Copy, Debug)]
pub struct CombineInputs {
    pub ml_probability: f64,
    pub heuristic_score: f64,
    pub ml_weight: f64,
    pub trusted: bool,
    pub threshold: f64,
}

/// Final score, verdict, and the weight actually used.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Combined {
    pub final_score: f64,
    pub verdict: Verdict,
    pub ml_weight_used: f64,
}

/// `final = ml * w + heuristic * (1 - w)`, dampened for trusted domains.
pub fn combine(inputs: CombineInputs) -> Combined {
    let ml = inputs.ml_probability.clamp(0.0, 1.0);
    let heur = inputs.heuristic_score.clamp(0.0, 1.0);
    let w = inputs.ml_weight.clamp(0.0, 1.0);

    let mut final_score = ml * w + heur * (1.0 - w);
    if inputs.trusted {
        final_score *= TRUST_DAMPENING;
    }
    let final_score = final_score.clamp(0.0, 1.0);

    Combined {
        final_score,
        verdict: classify(final_score, inputs.threshold),
        ml_weight_used: w,
    }
}

/// Lower the ML weight to [`ADAPTIVE_ML_WEIGHT`] when the heuristics are high,
/// the input is long, or the input is not a URL.
pub fn adaptive_ml_weight(ml_weight: f64, heuristic_score: f64, input_chars: usize, is_url: bool) -> f64 {
    if heuristic_score >= HIGH_HEURISTIC || input_chars > LONG_INPUT_CHARS || !is_url {
        ml_weight.min(ADAPTIVE_ML_WEIGHT)
    } else {
        ml_weight
    }
}

/// `phishing` at or above the threshold, `suspicious` at or above
/// `0.6 * threshold`, else `legitimate`.
pub fn classify(final_score: f64, threshold: f64) -> Verdict {
    if final_score >= threshold {
        Verdict::Phishing
    } else if final_score >= threshold * SUSPICIOUS_RATIO {
        Verdict::Suspicious
    } else {
        Verdict::Legitimate
    }
}
