use thiserror::Error;

/// Errors raised by the codec, probability matrices, and ensemble predictor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClaimsError {
    /// Label was not seen when the codec was fitted.
    #[error("unknown label {label:?}: not present in the fitted codec")]
    UnknownLabel {
        /// Offending label.
        label: String,
    },
    /// Class index outside `[0, class_count)`.
    #[error("class index {index} out of range for codec with {class_count} classes")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of classes in the codec.
        class_count: usize,
    },
    /// Matrix dimensions disagree with each other or with the codec.
    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which dimension mismatched (`rows`, `columns`, `row width`).
        what: &'static str,
        /// Expected size.
        expected: usize,
        /// Observed size.
        actual: usize,
    },
    /// Probability entry is negative or not finite.
    #[error("invalid probability {value} at row {row}, column {column}")]
    InvalidProbability {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Offending value.
        value: f64,
    },
    /// Persisted codec classes are not strictly sorted and unique.
    #[error("codec classes are not strictly sorted at position {position}")]
    UnsortedCodec {
        /// First position that breaks the ordering.
        position: usize,
    },
}

impl ClaimsError {
    pub(crate) const fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Result alias for core operations.
pub type ClaimsResult<T> = Result<T, ClaimsError>;
