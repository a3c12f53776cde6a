use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::label::Label;

/// Single labeled training paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Paragraph text.
    #[serde(alias = "Paragraph_Text")]
    pub text: String,
    /// Pre-tokenized text, used instead of `text` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
    /// Claim category.
    #[serde(alias = "sub_claim_combined", deserialize_with = "label_from_scalar")]
    pub label: Label,
}

impl TrainingExample {
    /// Creates an example from raw text and label.
    #[must_use]
    pub fn new(text: impl Into<String>, label: impl Into<Label>) -> Self {
        Self {
            text: text.into(),
            tokens: None,
            label: label.into(),
        }
    }

    /// Text the vectorizer sees.
    #[must_use]
    pub fn model_input(&self) -> &str {
        self.tokens.as_deref().unwrap_or(&self.text)
    }
}

/// Ordered collection of training examples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingSet {
    /// Examples in file order.
    pub examples: Vec<TrainingExample>,
}

impl TrainingSet {
    /// Wraps examples.
    #[must_use]
    pub const fn new(examples: Vec<TrainingExample>) -> Self {
        Self { examples }
    }

    /// Loads a JSON array of examples.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing training data {}", path.display()))
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the set holds no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Labels in example order.
    pub fn labels(&self) -> impl ExactSizeIterator<Item = &Label> {
        self.examples.iter().map(|example| &example.label)
    }

    /// Model inputs in example order.
    pub fn inputs(&self) -> impl ExactSizeIterator<Item = &str> {
        self.examples.iter().map(TrainingExample::model_input)
    }
}

/// Accepts string or numeric labels; numbers keep their JSON spelling.
fn label_from_scalar<'de, D>(deserializer: D) -> Result<Label, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Label::new(text)),
        Value::Number(number) => Ok(Label::new(number.to_string())),
        Value::Bool(flag) => Ok(Label::new(flag.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "label must be a string or number, got {other}"
        ))),
    }
}
