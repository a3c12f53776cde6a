//! Two-model ensemble: probability averaging and label decoding.

/// Row-wise argmax with lowest-index tie-break.
pub mod argmax;
/// Matrix averaging and the ensemble predictor.
pub mod combining;
/// Input validation ahead of combination.
pub mod reviewer;

pub use argmax::{argmax, predict_from_probabilities};
pub use combining::{combine, predict_ensemble, CombinationResult, EnsemblePredictor};
pub use reviewer::CombinationReviewer;
