use serde::{Deserialize, Serialize};

/// Report describing a claim model training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Model name.
    pub model: String,
    /// Number of training examples.
    pub samples: usize,
    /// Number of distinct classes in the codec.
    pub classes: usize,
    /// Vocabulary size.
    pub features: usize,
    /// Gradient descent iterations per class.
    pub epochs: usize,
    /// Mean weighted log loss after training.
    pub loss: f64,
    /// Accuracy on the training examples.
    pub train_accuracy: f64,
    /// Accuracy on held-out examples, when a validation split was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_accuracy: Option<f64>,
}

impl TrainingReport {
    /// Renders a concise summary string.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "[claims] model={} samples={} classes={} features={} loss={:.4} train_acc={:.4}",
            self.model, self.samples, self.classes, self.features, self.loss, self.train_accuracy
        );
        if let Some(validation) = self.validation_accuracy {
            line.push_str(&format!(" valid_acc={validation:.4}"));
        }
        line
    }
}
