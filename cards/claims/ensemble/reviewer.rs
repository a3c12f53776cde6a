use serde::{Deserialize, Serialize};

use crate::{error::ClaimsResult, matrix::ProbabilityMatrix};

/// Reviewer that validates probability matrices before they are combined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombinationReviewer {
    /// Allowed distance of a row sum from 1.0 before the row is counted as drifted.
    pub sum_tolerance: f64,
}

impl Default for CombinationReviewer {
    fn default() -> Self {
        Self {
            sum_tolerance: 1e-3,
        }
    }
}

impl CombinationReviewer {
    /// Rejects negative or non-finite entries and returns the number of rows
    /// whose sum drifts from 1.0 by more than the tolerance.
    ///
    /// Drifted rows are still usable since only the argmax is consumed.
    pub fn review(&self, probs: &ProbabilityMatrix) -> ClaimsResult<usize> {
        probs.validate()?;
        Ok(probs
            .rows()
            .filter(|row| (row.sum() - 1.0).abs() > self.sum_tolerance)
            .count())
    }
}
