use std::{
    collections::{BTreeMap, HashMap},
    sync::OnceLock,
};

use anyhow::{bail, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::config::VectorizerConfig;

/// Sparse feature row as `(feature index, value)` pairs sorted by index.
pub type SparseRow = Vec<(usize, f64)>;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Lowercases `text` and removes accents by NFKD decomposition, dropping the
/// combining marks.
#[must_use]
pub fn strip_accents(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|&c| !is_combining_mark(c))
        .collect()
}

/// Splits text into lowercase, accent-free word tokens of two or more
/// characters.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = strip_accents(text);
    token_pattern()
        .find_iter(&folded)
        .map(|token| token.as_str().to_owned())
        .collect()
}

/// TF-IDF vectorizer with word n-grams.
///
/// The vocabulary is stored in sorted term order, so a term's feature index is
/// its position and fitting is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_ngram: usize,
    sublinear_tf: bool,
    /// Term to inverse document frequency; feature index is the map position.
    vocabulary: IndexMap<String, f64>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary and idf weights from `documents`.
    pub fn fit<'a, I>(documents: I, config: &VectorizerConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max_ngram = config.max_ngram.max(1);
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut corpus_frequency: HashMap<String, usize> = HashMap::new();
        let mut n_documents = 0_usize;
        for document in documents {
            n_documents += 1;
            let counts = term_counts(document, max_ngram);
            for (term, count) in counts {
                *corpus_frequency.entry(term.clone()).or_default() += count;
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= config.min_df)
            .collect();
        if let Some(limit) = config.max_features {
            if kept.len() > limit {
                kept.sort_by(|(a, _), (b, _)| {
                    corpus_frequency[b]
                        .cmp(&corpus_frequency[a])
                        .then_with(|| a.cmp(b))
                });
                kept.truncate(limit);
                kept.sort_by(|(a, _), (b, _)| a.cmp(b));
            }
        }
        if kept.is_empty() {
            bail!(
                "no terms appear in at least {} of {n_documents} documents",
                config.min_df
            );
        }

        let vocabulary = kept
            .into_iter()
            .map(|(term, df)| {
                let idf = ((1.0 + n_documents as f64) / (1.0 + df as f64)).ln() + 1.0;
                (term, idf)
            })
            .collect();
        Ok(Self {
            max_ngram,
            sublinear_tf: config.sublinear_tf,
            vocabulary,
        })
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Feature index of `term`, if it is in the vocabulary.
    #[must_use]
    pub fn feature_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get_index_of(term)
    }

    /// L2-normalized TF-IDF row for one document. Unknown terms are ignored.
    #[must_use]
    pub fn transform_one(&self, document: &str) -> SparseRow {
        let mut row: SparseRow = term_counts(document, self.max_ngram)
            .into_iter()
            .filter_map(|(term, count)| {
                let (index, _, idf) = self.vocabulary.get_full(&term)?;
                let tf = if self.sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                Some((index, tf * idf))
            })
            .collect();
        row.sort_unstable_by_key(|(index, _)| *index);
        let norm = row.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut row {
                *value /= norm;
            }
        }
        row
    }

    /// Transforms a batch of documents.
    #[must_use]
    pub fn transform<'a, I>(&self, documents: I) -> Vec<SparseRow>
    where
        I: IntoIterator<Item = &'a str>,
    {
        documents
            .into_iter()
            .map(|document| self.transform_one(document))
            .collect()
    }
}

fn term_counts(document: &str, max_ngram: usize) -> HashMap<String, usize> {
    let tokens = tokenize(document);
    let mut counts = HashMap::new();
    for n in 1..=max_ngram {
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_default() += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_df: usize, max_ngram: usize) -> VectorizerConfig {
        VectorizerConfig {
            min_df,
            max_ngram,
            ..VectorizerConfig::default()
        }
    }

    #[test]
    fn tokenizer_lowercases_and_splits() {
        assert_eq!(
            tokenize("CO2 levels -- rising, again!"),
            vec!["co2", "levels", "rising", "again"]
        );
    }

    #[test]
    fn tokenizer_folds_accents_and_drops_single_characters() {
        assert_eq!(
            tokenize("Température élevée naïve"),
            vec!["temperature", "elevee", "naive"]
        );
        assert_eq!(tokenize("Sea <b>ice</b> is a 2 C rise"), vec!["sea", "ice", "is", "rise"]);
        assert_eq!(tokenize("ﬁnal Ångström"), vec!["final", "angstrom"]);
    }

    #[test]
    fn accented_and_plain_spellings_share_a_feature() {
        let vectorizer = TfidfVectorizer::fit(["café warming", "cafe cooling"], &config(2, 1)).unwrap();
        assert_eq!(vectorizer.n_features(), 1);
        assert_eq!(vectorizer.feature_index("cafe"), Some(0));
        assert_eq!(vectorizer.transform_one("CAFÉ"), vec![(0, 1.0)]);
    }

    #[test]
    fn vocabulary_is_sorted_and_filtered_by_min_df() {
        let docs = ["warming is real", "warming is slow", "ice is melting"];
        let vectorizer = TfidfVectorizer::fit(docs, &config(2, 2)).unwrap();
        assert_eq!(vectorizer.n_features(), 3);
        assert_eq!(vectorizer.feature_index("is"), Some(0));
        assert_eq!(vectorizer.feature_index("warming"), Some(1));
        assert_eq!(vectorizer.feature_index("warming is"), Some(2));
        assert_eq!(vectorizer.feature_index("ice"), None);
    }

    #[test]
    fn rows_are_unit_length() {
        let docs = ["sea level rise", "sea ice", "sea level"];
        let vectorizer = TfidfVectorizer::fit(docs, &config(1, 1)).unwrap();
        let row = vectorizer.transform_one("sea sea level");
        let norm: f64 = row.iter().map(|(_, v)| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(row.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn unknown_document_is_an_empty_row() {
        let vectorizer = TfidfVectorizer::fit(["alpha beta"], &config(1, 1)).unwrap();
        assert!(vectorizer.transform_one("gamma delta").is_empty());
    }

    #[test]
    fn max_features_keeps_most_frequent_terms() {
        let docs = ["hot hot hot day", "hot night", "cold day"];
        let cfg = VectorizerConfig {
            min_df: 1,
            max_ngram: 1,
            max_features: Some(2),
            ..VectorizerConfig::default()
        };
        let vectorizer = TfidfVectorizer::fit(docs, &cfg).unwrap();
        assert_eq!(vectorizer.n_features(), 2);
        assert_eq!(vectorizer.feature_index("day"), Some(0));
        assert_eq!(vectorizer.feature_index("hot"), Some(1));
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        assert!(TfidfVectorizer::fit(["one doc"], &config(3, 1)).is_err());
    }
}
