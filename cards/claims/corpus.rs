use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Paragraph scheduled for claim inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphRecord {
    /// Paragraph identifier.
    pub pid: Value,
    /// Source domain.
    #[serde(default)]
    pub domain: Value,
    /// Publication date.
    #[serde(default)]
    pub date: Value,
    /// Contrarian think-tank status of the source.
    #[serde(default)]
    pub ctt_status: Value,
    /// Raw paragraph text.
    #[serde(default)]
    pub text: String,
    /// Pre-tokenized text, if an upstream step produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
    /// Probability row produced by the second (transfer learning) model.
    #[serde(default)]
    pub ulmfit_probs: Vec<f64>,
}

/// Errors raised while reading an inference corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Directory holds no JSON shards.
    #[error("no .json shards found in {0}")]
    NoShards(PathBuf),
    /// I/O error (filesystem).
    #[error("io error reading {path}: {source}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// JSON parsing failure.
    #[error("json error in {path}: {source}")]
    Json {
        /// Shard being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Loads paragraph records from one JSON file or a directory of JSON shards.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    root: PathBuf,
}

impl CorpusLoader {
    /// Creates a loader for `root` (file or directory).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Shard files in the order they are read: file-name order for directories.
    pub fn shards(&self) -> Result<Vec<PathBuf>, CorpusError> {
        if !self.root.is_dir() {
            return Ok(vec![self.root.clone()]);
        }
        let entries = fs::read_dir(&self.root).map_err(|source| CorpusError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut shards = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| CorpusError::Io {
                    path: self.root.clone(),
                    source,
                })?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                shards.push(path);
            }
        }
        if shards.is_empty() {
            return Err(CorpusError::NoShards(self.root.clone()));
        }
        shards.sort();
        Ok(shards)
    }

    /// Reads every shard and concatenates the records in shard order.
    pub fn load(&self) -> Result<Vec<ParagraphRecord>, CorpusError> {
        let mut records = Vec::new();
        for shard in self.shards()? {
            records.extend(read_shard(&shard)?);
        }
        Ok(records)
    }
}

fn read_shard(path: &Path) -> Result<Vec<ParagraphRecord>, CorpusError> {
    let contents = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}
