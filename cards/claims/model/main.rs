//! TF-IDF + logistic regression claim model and its training pipeline.

/// Training data types.
pub mod editor;
/// Split and scoring helpers.
pub mod func;
/// One-vs-rest logistic regression.
pub mod logistic;
/// Training reports.
pub mod reporter;
/// TF-IDF feature extraction.
pub mod vectorizer;

use std::{fs, io::Write, path::Path};

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

use editor::TrainingSet;
use logistic::LogisticClassifier;
use reporter::TrainingReport;
use vectorizer::TfidfVectorizer;

use crate::{
    config::ClaimsConfig,
    ensemble::predict_from_probabilities,
    label::{Label, LabelCodec},
    matrix::ProbabilityMatrix,
    telemetry::{log, ClaimsTelemetry},
};

const MODEL_NAME: &str = "tfidf_logistic_ovr";

/// A classifier that scores texts against a fixed label codec.
pub trait ProbabilisticClassifier {
    /// Codec whose ordering the probability columns follow.
    fn codec(&self) -> &LabelCodec;

    /// One probability row per text, `codec().class_count()` columns wide.
    fn predict_proba(&self, texts: &[&str]) -> Result<ProbabilityMatrix>;
}

/// Trained model bundle: codec, vectorizer, and classifier persisted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimModel {
    /// Bundle identifier.
    pub id: Uuid,
    /// Training completion time.
    pub trained_at: DateTime<Utc>,
    codec: LabelCodec,
    vectorizer: TfidfVectorizer,
    classifier: LogisticClassifier,
}

impl ClaimModel {
    /// Assembles a bundle after checking the parts agree on dimensions.
    pub fn new(
        codec: LabelCodec,
        vectorizer: TfidfVectorizer,
        classifier: LogisticClassifier,
    ) -> Result<Self> {
        let model = Self {
            id: Uuid::new_v4(),
            trained_at: Utc::now(),
            codec,
            vectorizer,
            classifier,
        };
        model.check_dimensions()?;
        Ok(model)
    }

    /// Loads a bundle written by [`ClaimModel::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading model bundle {}", path.display()))?;
        let model: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing model bundle {}", path.display()))?;
        model.check_dimensions()?;
        Ok(model)
    }

    /// Writes the bundle as pretty JSON with a trailing newline.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)
            .with_context(|| format!("creating model bundle {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// The vectorizer used for feature extraction.
    #[must_use]
    pub const fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Predicts one label per text from this model alone.
    pub fn predict(&self, texts: &[&str]) -> Result<Vec<Label>> {
        let probs = self.predict_proba(texts)?;
        Ok(predict_from_probabilities(&probs, &self.codec)?)
    }

    fn check_dimensions(&self) -> Result<()> {
        ensure!(
            self.classifier.n_classes() == self.codec.class_count(),
            "classifier has {} classes but codec has {}",
            self.classifier.n_classes(),
            self.codec.class_count()
        );
        ensure!(
            self.classifier.n_biases() == self.classifier.n_classes(),
            "classifier has {} bias terms for {} classes",
            self.classifier.n_biases(),
            self.classifier.n_classes()
        );
        ensure!(
            self.classifier.n_features() == self.vectorizer.n_features(),
            "classifier expects {} features but vectorizer produces {}",
            self.classifier.n_features(),
            self.vectorizer.n_features()
        );
        Ok(())
    }
}

impl ProbabilisticClassifier for ClaimModel {
    fn codec(&self) -> &LabelCodec {
        &self.codec
    }

    fn predict_proba(&self, texts: &[&str]) -> Result<ProbabilityMatrix> {
        let rows = self.vectorizer.transform(texts.iter().copied());
        Ok(self.classifier.predict_proba(&rows))
    }
}

/// Fits the codec, vectorizer, and classifier from a training set.
#[derive(Debug, Clone, Default)]
pub struct ClaimTrainingPipeline {
    config: ClaimsConfig,
}

impl ClaimTrainingPipeline {
    /// Creates a pipeline with the given settings.
    #[must_use]
    pub const fn new(config: ClaimsConfig) -> Self {
        Self { config }
    }

    /// Trains a model and returns it with its report.
    pub fn run(&self, dataset: &TrainingSet) -> Result<(ClaimModel, TrainingReport)> {
        self.run_with_telemetry(dataset, None)
    }

    /// Trains a model with optional telemetry instrumentation.
    pub fn run_with_telemetry(
        &self,
        dataset: &TrainingSet,
        telemetry: Option<&ClaimsTelemetry>,
    ) -> Result<(ClaimModel, TrainingReport)> {
        ensure!(!dataset.is_empty(), "training set is empty");
        let codec = LabelCodec::fit(dataset.labels().cloned());
        let targets = codec.encode_all(dataset.labels().map(Label::as_str))?;
        log(
            telemetry,
            LogLevel::Info,
            "model_fit_start",
            json!({ "samples": dataset.len(), "classes": codec.class_count() }),
        );

        let vectorizer = TfidfVectorizer::fit(dataset.inputs(), &self.config.vectorizer)?;
        let rows = vectorizer.transform(dataset.inputs());
        log(
            telemetry,
            LogLevel::Debug,
            "model_vectorized",
            json!({ "features": vectorizer.n_features(), "min_df": self.config.vectorizer.min_df }),
        );

        let mut classifier = LogisticClassifier::new(codec.class_count(), vectorizer.n_features());
        let loss = classifier.fit(&rows, &targets, &self.config.logistic)?;
        let model = ClaimModel::new(codec, vectorizer, classifier)?;

        let inputs: Vec<&str> = dataset.inputs().collect();
        let predictions = model.predict(&inputs)?;
        let report = TrainingReport {
            model: MODEL_NAME.into(),
            samples: dataset.len(),
            classes: model.codec().class_count(),
            features: model.vectorizer().n_features(),
            epochs: self.config.logistic.max_iter,
            loss,
            train_accuracy: func::accuracy(&predictions, dataset.labels()),
            validation_accuracy: None,
        };
        log(
            telemetry,
            LogLevel::Info,
            "model_fit_complete",
            json!({ "loss": report.loss, "train_accuracy": report.train_accuracy }),
        );
        Ok((model, report))
    }

    /// Accuracy of `model` on labeled examples it was not trained on.
    ///
    /// Labels unknown to the model simply count as misses.
    pub fn evaluate(model: &ClaimModel, dataset: &TrainingSet) -> Result<f64> {
        let inputs: Vec<&str> = dataset.inputs().collect();
        let predictions = model.predict(&inputs)?;
        Ok(func::accuracy(&predictions, dataset.labels()))
    }
}
