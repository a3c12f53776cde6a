use ndarray::ArrayView1;

use crate::{
    error::{ClaimsError, ClaimsResult},
    label::{Label, LabelCodec},
    matrix::ProbabilityMatrix,
};

/// Index of the largest value in `row`, scanning left to right.
///
/// Only a strictly greater value replaces the current best, so ties resolve to
/// the lowest index and NaN never wins. An empty row yields `None`.
#[must_use]
pub fn argmax(row: ArrayView1<'_, f64>) -> Option<usize> {
    let mut values = row.iter().enumerate();
    let (mut best_index, mut best_value) = values.next().map(|(index, &value)| (index, value))?;
    for (index, &value) in values {
        if value > best_value || (best_value.is_nan() && !value.is_nan()) {
            best_index = index;
            best_value = value;
        }
    }
    Some(best_index)
}

/// Decodes the argmax of every row into a label.
pub fn predict_from_probabilities(
    probs: &ProbabilityMatrix,
    codec: &LabelCodec,
) -> ClaimsResult<Vec<Label>> {
    if probs.n_classes() != codec.class_count() {
        return Err(ClaimsError::shape(
            "columns",
            codec.class_count(),
            probs.n_classes(),
        ));
    }
    probs
        .rows()
        .map(|row| codec.decode(argmax(row).unwrap_or(0)).cloned())
        .collect()
}
