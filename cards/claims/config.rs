use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ensemble::CombinationReviewer;

/// Settings for training and inference, loaded from a TOML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// TF-IDF feature extraction.
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    /// One-vs-rest logistic regression.
    #[serde(default)]
    pub logistic: LogisticConfig,
    /// Inference batch behavior.
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Ensemble input review.
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

impl ClaimsConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading claims config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    fn validate(&self) -> Result<()> {
        if self.vectorizer.min_df == 0 {
            bail!("vectorizer.min_df must be at least 1");
        }
        if self.vectorizer.max_ngram == 0 {
            bail!("vectorizer.max_ngram must be at least 1");
        }
        if self.vectorizer.max_features == Some(0) {
            bail!("vectorizer.max_features must be positive when set");
        }
        if !(self.logistic.c.is_finite() && self.logistic.c > 0.0) {
            bail!("logistic.c must be a positive number");
        }
        if !(self.logistic.learning_rate.is_finite() && self.logistic.learning_rate > 0.0) {
            bail!("logistic.learning_rate must be a positive number");
        }
        if self.logistic.max_iter == 0 {
            bail!("logistic.max_iter must be at least 1");
        }
        if self.inference.log_every == 0 {
            bail!("inference.log_every must be at least 1");
        }
        if !(self.ensemble.sum_tolerance.is_finite() && self.ensemble.sum_tolerance >= 0.0) {
            bail!("ensemble.sum_tolerance must be a non-negative number");
        }
        Ok(())
    }
}

/// TF-IDF settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Minimum number of documents a term must appear in.
    #[serde(default = "default_min_df")]
    pub min_df: usize,
    /// Longest n-gram extracted (1 = unigrams only).
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,
    /// Use `1 + ln(tf)` instead of raw term counts.
    #[serde(default = "default_true")]
    pub sublinear_tf: bool,
    /// Keep only the most frequent terms when set.
    #[serde(default)]
    pub max_features: Option<usize>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            min_df: default_min_df(),
            max_ngram: default_max_ngram(),
            sublinear_tf: default_true(),
            max_features: None,
        }
    }
}

/// Per-sample weighting used while fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Weights inversely proportional to class frequency.
    #[default]
    Balanced,
    /// Every sample weighs 1.
    Uniform,
}

/// Logistic regression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    #[serde(default = "default_c")]
    pub c: f64,
    /// Gradient descent iterations per class.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Gradient descent step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Sample weighting strategy.
    #[serde(default)]
    pub class_weight: ClassWeight,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: default_c(),
            max_iter: default_max_iter(),
            learning_rate: default_learning_rate(),
            class_weight: ClassWeight::default(),
        }
    }
}

/// Inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Emit a progress log every this many records.
    #[serde(default = "default_log_every")]
    pub log_every: usize,
    /// Records with fewer tokens are skipped (at least one token is always required).
    #[serde(default)]
    pub min_tokens: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            log_every: default_log_every(),
            min_tokens: 0,
        }
    }
}

/// Ensemble review settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Allowed deviation of a probability row sum from 1.0 before it is reported.
    #[serde(default = "default_sum_tolerance")]
    pub sum_tolerance: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            sum_tolerance: default_sum_tolerance(),
        }
    }
}

impl EnsembleConfig {
    /// Builds the reviewer these settings describe.
    #[must_use]
    pub const fn reviewer(&self) -> CombinationReviewer {
        CombinationReviewer {
            sum_tolerance: self.sum_tolerance,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_min_df() -> usize {
    3
}

const fn default_max_ngram() -> usize {
    2
}

const fn default_c() -> f64 {
    7.96
}

const fn default_max_iter() -> usize {
    200
}

const fn default_learning_rate() -> f64 {
    0.5
}

const fn default_log_every() -> usize {
    10_000
}

const fn default_sum_tolerance() -> f64 {
    1e-3
}
