use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ClaimsError, ClaimsResult};

/// Rows are input examples, columns are codec-ordered class probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityMatrix {
    values: Array2<f64>,
}

impl ProbabilityMatrix {
    /// Wraps an existing array.
    #[must_use]
    pub const fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Zero-row matrix with `n_classes` columns; used for empty batches.
    #[must_use]
    pub fn empty(n_classes: usize) -> Self {
        Self {
            values: Array2::zeros((0, n_classes)),
        }
    }

    /// Builds a matrix from row vectors.
    ///
    /// With zero rows the column count is unknown and defaults to `n_classes`.
    pub fn from_rows(rows: &[Vec<f64>], n_classes: usize) -> ClaimsResult<Self> {
        let mut values = Array2::zeros((rows.len(), n_classes));
        for (index, row) in rows.iter().enumerate() {
            if row.len() != n_classes {
                return Err(ClaimsError::shape("row width", n_classes, row.len()));
            }
            values
                .row_mut(index)
                .assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(Self { values })
    }

    /// Number of rows (input examples).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns (classes).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.values.ncols()
    }

    /// Value at `[row, column]`, if in range.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get((row, column)).copied()
    }

    /// Iterates over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.values.axis_iter(Axis(0))
    }

    /// Borrows the underlying array.
    #[must_use]
    pub const fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Fails on the first negative or non-finite entry (row-major order).
    pub fn validate(&self) -> ClaimsResult<()> {
        for ((row, column), &value) in self.values.indexed_iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(ClaimsError::InvalidProbability { row, column, value });
            }
        }
        Ok(())
    }
}

impl From<Array2<f64>> for ProbabilityMatrix {
    fn from(values: Array2<f64>) -> Self {
        Self::new(values)
    }
}
