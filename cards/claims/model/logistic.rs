use anyhow::{ensure, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    config::{ClassWeight, LogisticConfig},
    matrix::ProbabilityMatrix,
    model::vectorizer::SparseRow,
};

/// One-vs-rest logistic regression over sparse features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    /// One weight row per class.
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl LogisticClassifier {
    /// Zero-initialized model.
    #[must_use]
    pub fn new(n_classes: usize, n_features: usize) -> Self {
        Self {
            weights: Array2::zeros((n_classes, n_features)),
            bias: Array1::zeros(n_classes),
        }
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of bias terms; a consistent model has one per class.
    #[must_use]
    pub fn n_biases(&self) -> usize {
        self.bias.len()
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.weights.ncols()
    }

    /// Fits one binary model per class with full-batch gradient descent and
    /// returns the mean weighted log loss across classes after training.
    ///
    /// The objective per class is `(1/n) * sum(w_i * logloss_i) + |w|^2 / (2 * C * n)`.
    pub fn fit(
        &mut self,
        rows: &[SparseRow],
        targets: &[usize],
        config: &LogisticConfig,
    ) -> Result<f64> {
        ensure!(
            rows.len() == targets.len(),
            "{} feature rows but {} targets",
            rows.len(),
            targets.len()
        );
        ensure!(!rows.is_empty(), "cannot fit on an empty training set");
        let n_classes = self.n_classes();
        if let Some(&bad) = targets.iter().find(|&&target| target >= n_classes) {
            anyhow::bail!("target {bad} outside {n_classes} classes");
        }

        let sample_weights = sample_weights(targets, n_classes, config.class_weight);
        let n = rows.len() as f64;
        let penalty = 1.0 / (config.c * n);
        let mut total_loss = 0.0;

        for class in 0..n_classes {
            let labels: Vec<f64> = targets
                .iter()
                .map(|&target| if target == class { 1.0 } else { 0.0 })
                .collect();
            for _ in 0..config.max_iter {
                let mut grad = Array1::<f64>::zeros(self.n_features());
                let mut bias_grad = 0.0;
                for ((row, label), weight) in rows.iter().zip(&labels).zip(&sample_weights) {
                    let error = weight * (sigmoid(self.margin(class, row)) - label);
                    for &(feature, value) in row {
                        grad[feature] += error * value;
                    }
                    bias_grad += error;
                }
                let mut class_weights = self.weights.row_mut(class);
                let step = &grad / n + &class_weights * penalty;
                class_weights.scaled_add(-config.learning_rate, &step);
                self.bias[class] -= config.learning_rate * bias_grad / n;
            }
            total_loss += rows
                .iter()
                .zip(&labels)
                .zip(&sample_weights)
                .map(|((row, label), weight)| weight * log_loss(self.margin(class, row), *label))
                .sum::<f64>()
                / n;
        }
        Ok(total_loss / n_classes.max(1) as f64)
    }

    /// Class probabilities per row; per-class sigmoids normalized to sum to one.
    #[must_use]
    pub fn predict_proba(&self, rows: &[SparseRow]) -> ProbabilityMatrix {
        let n_classes = self.n_classes();
        let mut probs = Array2::zeros((rows.len(), n_classes));
        for (index, row) in rows.iter().enumerate() {
            let mut out = probs.row_mut(index);
            for class in 0..n_classes {
                out[class] = sigmoid(self.margin(class, row));
            }
            let total = out.sum();
            if total > 0.0 {
                out /= total;
            } else if n_classes > 0 {
                out.fill(1.0 / n_classes as f64);
            }
        }
        ProbabilityMatrix::new(probs)
    }

    fn margin(&self, class: usize, row: &SparseRow) -> f64 {
        let weights = self.weights.row(class);
        row.iter()
            .map(|&(feature, value)| weights[feature] * value)
            .sum::<f64>()
            + self.bias[class]
    }
}

fn sample_weights(targets: &[usize], n_classes: usize, strategy: ClassWeight) -> Vec<f64> {
    match strategy {
        ClassWeight::Uniform => vec![1.0; targets.len()],
        ClassWeight::Balanced => {
            let mut counts = vec![0_usize; n_classes];
            for &target in targets {
                counts[target] += 1;
            }
            let scale = targets.len() as f64 / n_classes as f64;
            targets
                .iter()
                .map(|&target| scale / counts[target] as f64)
                .collect()
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary cross-entropy computed from the margin for numerical stability.
fn log_loss(z: f64, label: f64) -> f64 {
    let softplus = if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    };
    softplus - label * z
}
