use serde::{Deserialize, Serialize};

use super::{argmax::predict_from_probabilities, reviewer::CombinationReviewer};
use crate::{
    error::{ClaimsError, ClaimsResult},
    label::{Label, LabelCodec},
    matrix::ProbabilityMatrix,
};

/// Unweighted element-wise mean of two equally shaped matrices.
pub fn combine(
    probs_a: &ProbabilityMatrix,
    probs_b: &ProbabilityMatrix,
) -> ClaimsResult<ProbabilityMatrix> {
    if probs_a.n_rows() != probs_b.n_rows() {
        return Err(ClaimsError::shape("rows", probs_a.n_rows(), probs_b.n_rows()));
    }
    if probs_a.n_classes() != probs_b.n_classes() {
        return Err(ClaimsError::shape(
            "columns",
            probs_a.n_classes(),
            probs_b.n_classes(),
        ));
    }
    let sum = probs_a.as_array() + probs_b.as_array();
    Ok(ProbabilityMatrix::new(sum / 2.0))
}

/// Averages both matrices and decodes the per-row argmax.
pub fn predict_ensemble(
    probs_a: &ProbabilityMatrix,
    probs_b: &ProbabilityMatrix,
    codec: &LabelCodec,
) -> ClaimsResult<Vec<Label>> {
    predict_from_probabilities(&combine(probs_a, probs_b)?, codec)
}

/// Result produced by the ensemble predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationResult {
    /// One label per input row.
    pub labels: Vec<Label>,
    /// Averaged probabilities the labels were decoded from.
    pub probabilities: ProbabilityMatrix,
    /// Input rows (across both matrices) whose sums drifted from 1.0.
    pub drifted_rows: usize,
}

/// Two-model ensemble that reviews its inputs before combining them.
#[derive(Debug, Clone, Default)]
pub struct EnsemblePredictor {
    reviewer: CombinationReviewer,
}

impl EnsemblePredictor {
    /// Creates a predictor with the given reviewer.
    #[must_use]
    pub const fn new(reviewer: CombinationReviewer) -> Self {
        Self { reviewer }
    }

    /// Validates both inputs, combines them, and decodes labels.
    pub fn predict(
        &self,
        probs_a: &ProbabilityMatrix,
        probs_b: &ProbabilityMatrix,
        codec: &LabelCodec,
    ) -> ClaimsResult<CombinationResult> {
        let drifted_rows = self.reviewer.review(probs_a)? + self.reviewer.review(probs_b)?;
        let probabilities = combine(probs_a, probs_b)?;
        let labels = predict_from_probabilities(&probabilities, codec)?;
        Ok(CombinationResult {
            labels,
            probabilities,
            drifted_rows,
        })
    }
}
