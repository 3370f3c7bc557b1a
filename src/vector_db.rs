use lazy_static::lazy_static;
use ndarray::{Array1, Array2};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use unicode_normalization::UnicodeNormalization;

use crate::error::IndexError;

/// TF-IDF vector space over a fixed corpus of short texts.
///
/// Rows of `matrix` are the L2-normalized vectors of the corpus, in corpus
/// order, so cosine similarity against a query is a single matrix-vector
/// product. The vocabulary and IDF weights are frozen at build time.
#[derive(Debug, Clone)]
pub struct TfidfIndex {
    vocabulary: FxHashMap<String, usize>,
    idf: Array1<f32>,
    matrix: Array2<f32>,
}

impl TfidfIndex {
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Result<Self, IndexError> {
        if corpus.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let docs: Vec<Vec<String>> = corpus.iter().map(|d| tokenize(d.as_ref())).collect();

        // Sorted so that column order does not depend on hashing
        let mut terms: Vec<&str> = docs
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        terms.sort_unstable();

        let vocabulary: FxHashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        let mut doc_freq = vec![0usize; vocabulary.len()];
        for tokens in &docs {
            let seen: FxHashSet<usize> = tokens
                .iter()
                .filter_map(|t| vocabulary.get(t.as_str()).copied())
                .collect();
            for column in seen {
                doc_freq[column] += 1;
            }
        }

        // Smoothed IDF: ln((1 + n) / (1 + df)) + 1
        let n = corpus.len() as f32;
        let idf = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0)
            .collect::<Array1<f32>>();

        let mut index = TfidfIndex {
            vocabulary,
            idf,
            matrix: Array2::zeros((docs.len(), terms.len())),
        };

        for (row, tokens) in docs.iter().enumerate() {
            let vector = index.vectorize(tokens);
            index.matrix.row_mut(row).assign(&vector);
        }

        Ok(index)
    }

    /// Number of indexed texts.
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Cosine similarity of `query` against every indexed text, in corpus
    /// order. Always `len()` scores, each within `[0, 1]`.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let query_vector = self.vectorize(&tokenize(query));
        self.matrix
            .dot(&query_vector)
            .iter()
            .map(|s| s.clamp(0.0, 1.0))
            .collect()
    }

    /// All entries by descending score. Equal scores keep corpus order.
    pub fn rank(&self, query: &str) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> =
            self.scores(query).into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Highest-scoring entry; the first one wins a tie.
    pub fn best(&self, query: &str) -> (usize, f32) {
        // build() rejects empty corpora, so there is always a first entry
        self.rank(query)[0]
    }

    fn vectorize(&self, tokens: &[String]) -> Array1<f32> {
        let mut vector = Array1::<f32>::zeros(self.idf.len());
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token.as_str()) {
                vector[column] += 1.0;
            }
        }

        vector *= &self.idf;

        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector /= norm;
        }
        vector
    }
}

/// NFC + lowercase, then every run of two or more word characters.
fn tokenize(text: &str) -> Vec<String> {
    lazy_static! {
        static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").unwrap();
    }

    let text = text.nfc().collect::<String>().to_lowercase();

    TOKEN
        .find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}
