use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};

use crate::{label::Label, model::editor::TrainingSet};

/// Shuffles with a fixed seed and splits into train/validation partitions.
///
/// The validation ratio is clamped so both sides keep at least 10% of the data.
#[must_use]
pub fn train_validation_split(
    dataset: &TrainingSet,
    validation_ratio: f64,
    seed: u64,
) -> (TrainingSet, TrainingSet) {
    let mut order: Vec<usize> = (0..dataset.len()).collect();
    order.shuffle(&mut SmallRng::seed_from_u64(seed));
    let split = ((1.0 - validation_ratio).clamp(0.1, 0.9) * dataset.len() as f64).round() as usize;
    let mut train = TrainingSet::default();
    let mut validation = TrainingSet::default();
    for (position, index) in order.into_iter().enumerate() {
        let example = dataset.examples[index].clone();
        if position < split {
            train.examples.push(example);
        } else {
            validation.examples.push(example);
        }
    }
    (train, validation)
}

/// Fraction of predictions equal to the expected label.
#[must_use]
pub fn accuracy<'a>(
    predictions: &[Label],
    expected: impl ExactSizeIterator<Item = &'a Label>,
) -> f64 {
    if predictions.is_empty() || predictions.len() != expected.len() {
        return 0.0;
    }
    let hits = predictions
        .iter()
        .zip(expected)
        .filter(|(predicted, truth)| predicted == truth)
        .count();
    hits as f64 / predictions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::editor::TrainingExample;

    fn dataset(count: usize) -> TrainingSet {
        TrainingSet::new(
            (0..count)
                .map(|index| TrainingExample::new(format!("paragraph {index}"), "0_0"))
                .collect(),
        )
    }

    #[test]
    fn split_generates_partitions() {
        let (train, validation) = train_validation_split(&dataset(10), 0.2, 7);
        assert_eq!(train.len(), 8);
        assert_eq!(validation.len(), 2);
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        let (a, _) = train_validation_split(&dataset(20), 0.25, 42);
        let (b, _) = train_validation_split(&dataset(20), 0.25, 42);
        let texts_a: Vec<&str> = a.inputs().collect();
        let texts_b: Vec<&str> = b.inputs().collect();
        assert_eq!(texts_a, texts_b);
    }

    #[test]
    fn accuracy_counts_hits() {
        let predictions = vec![Label::from("a"), Label::from("b"), Label::from("b")];
        let truth = vec![Label::from("a"), Label::from("a"), Label::from("b")];
        let score = accuracy(&predictions, truth.iter());
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
        assert!(accuracy(&predictions, truth[..1].iter()).abs() < f64::EPSILON);
    }
}
