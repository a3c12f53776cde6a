use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{ClaimsError, ClaimsResult};

/// Claim category identifier (e.g. a taxonomy code such as `1.1.2`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Wraps a raw string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps into the owned string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bidirectional mapping between class index and label.
///
/// Classes are the distinct fitted labels in byte-wise lexicographic order, so
/// index assignment only depends on the label set and never on input order.
/// Probability matrices are positional: column `i` always means `decode(i)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CodecDocument", into = "CodecDocument")]
pub struct LabelCodec {
    classes: Vec<Label>,
}

impl LabelCodec {
    /// Builds a codec from every label observed in training data.
    #[must_use]
    pub fn fit<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let distinct: BTreeSet<Label> = labels.into_iter().map(Into::into).collect();
        Self {
            classes: distinct.into_iter().collect(),
        }
    }

    /// Returns the index of `label`.
    pub fn encode(&self, label: &str) -> ClaimsResult<usize> {
        self.classes
            .binary_search_by(|probe| probe.as_str().cmp(label))
            .map_err(|_| ClaimsError::UnknownLabel {
                label: label.to_owned(),
            })
    }

    /// Encodes a batch of labels, failing on the first unknown one.
    pub fn encode_all<'a, I>(&self, labels: I) -> ClaimsResult<Vec<usize>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels.into_iter().map(|label| self.encode(label)).collect()
    }

    /// Returns the label stored at `index`.
    pub fn decode(&self, index: usize) -> ClaimsResult<&Label> {
        self.classes
            .get(index)
            .ok_or(ClaimsError::IndexOutOfRange {
                index,
                class_count: self.classes.len(),
            })
    }

    /// Number of distinct labels.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Classes in index order.
    #[must_use]
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }
}

#[derive(Serialize, Deserialize)]
struct CodecDocument {
    classes: Vec<Label>,
}

impl TryFrom<CodecDocument> for LabelCodec {
    type Error = ClaimsError;

    fn try_from(document: CodecDocument) -> Result<Self, Self::Error> {
        if let Some(position) = document
            .classes
            .windows(2)
            .position(|pair| pair[0] >= pair[1])
        {
            return Err(ClaimsError::UnsortedCodec {
                position: position + 1,
            });
        }
        Ok(Self {
            classes: document.classes,
        })
    }
}

impl From<LabelCodec> for CodecDocument {
    fn from(codec: LabelCodec) -> Self {
        Self {
            classes: codec.classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_sorts_and_deduplicates() {
        let codec = LabelCodec::fit(["0.0.0", "1.1.2", "1.1.2", "2.3.0"]);
        let classes: Vec<&str> = codec.classes().iter().map(Label::as_str).collect();
        assert_eq!(classes, vec!["0.0.0", "1.1.2", "2.3.0"]);
        assert_eq!(codec.class_count(), 3);
        assert_eq!(codec.encode("2.3.0").unwrap(), 2);
    }

    #[test]
    fn fit_ignores_input_order() {
        let a = LabelCodec::fit(["gamma", "alpha", "beta", "alpha"]);
        let b = LabelCodec::fit(["alpha", "beta", "alpha", "gamma"]);
        assert_eq!(a, b);
    }

    #[test]
    fn encode_unknown_label_fails() {
        let codec = LabelCodec::fit(["a", "b"]);
        let err = codec.encode("c").unwrap_err();
        assert_eq!(
            err,
            ClaimsError::UnknownLabel {
                label: "c".to_owned()
            }
        );
        assert!(err.to_string().contains("\"c\""));
    }

    #[test]
    fn decode_out_of_range_fails() {
        let codec = LabelCodec::fit(["a", "b"]);
        assert_eq!(
            codec.decode(2).unwrap_err(),
            ClaimsError::IndexOutOfRange {
                index: 2,
                class_count: 2
            }
        );
    }

    #[test]
    fn round_trips_indices_and_labels() {
        let codec = LabelCodec::fit(["x", "m", "a", "q"]);
        for index in 0..codec.class_count() {
            let label = codec.decode(index).unwrap();
            assert_eq!(codec.encode(label.as_str()).unwrap(), index);
        }
    }

    #[test]
    fn lexicographic_not_numeric_order() {
        let codec = LabelCodec::fit(["10", "9", "1"]);
        assert_eq!(codec.decode(0).unwrap().as_str(), "1");
        assert_eq!(codec.decode(1).unwrap().as_str(), "10");
        assert_eq!(codec.decode(2).unwrap().as_str(), "9");
    }

    #[test]
    fn serde_round_trip_preserves_indices() {
        let codec = LabelCodec::fit(["5_1", "0_0", "3_2"]);
        let raw = serde_json::to_string(&codec).unwrap();
        assert_eq!(raw, r#"{"classes":["0_0","3_2","5_1"]}"#);
        let restored: LabelCodec = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, codec);
    }

    #[test]
    fn rejects_unsorted_persisted_codec() {
        let err = serde_json::from_str::<LabelCodec>(r#"{"classes":["b","a"]}"#).unwrap_err();
        assert!(err.to_string().contains("not strictly sorted"));
        assert!(serde_json::from_str::<LabelCodec>(r#"{"classes":["a","a"]}"#).is_err());
    }

    #[test]
    fn empty_codec_has_no_classes() {
        let codec = LabelCodec::fit(Vec::<String>::new());
        assert_eq!(codec.class_count(), 0);
        assert!(codec.decode(0).is_err());
    }
}
