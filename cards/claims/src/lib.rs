#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

//! CARDS claim classification: label codec, two-model ensemble prediction,
//! a TF-IDF logistic model, and the batch inference pipeline around them.

/// Core error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Label newtype and index codec.
#[path = "../label.rs"]
pub mod label;

/// Probability matrix wrapper.
#[path = "../matrix.rs"]
pub mod matrix;

/// Ensemble averaging and argmax decoding.
#[path = "../ensemble/main.rs"]
pub mod ensemble;

/// Linear claim model and training pipeline.
#[path = "../model/main.rs"]
pub mod model;

/// Inference corpus loading.
#[path = "../corpus.rs"]
pub mod corpus;

/// Batch inference and report writing.
#[path = "../inference.rs"]
pub mod inference;

/// TOML configuration.
#[path = "../config.rs"]
pub mod config;

/// Structured logging handle.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use config::{ClaimsConfig, ClassWeight};
pub use corpus::{CorpusError, CorpusLoader, ParagraphRecord};
pub use ensemble::{
    combine, predict_ensemble, predict_from_probabilities, CombinationResult, CombinationReviewer,
    EnsemblePredictor,
};
pub use error::{ClaimsError, ClaimsResult};
pub use inference::{write_reports, ClaimReport, InferencePipeline, InferenceSummary};
pub use label::{Label, LabelCodec};
pub use matrix::ProbabilityMatrix;
pub use model::{
    editor::{TrainingExample, TrainingSet},
    func::train_validation_split,
    reporter::TrainingReport,
    ClaimModel, ClaimTrainingPipeline, ProbabilisticClassifier,
};
pub use telemetry::{ClaimsTelemetry, ClaimsTelemetryBuilder};
