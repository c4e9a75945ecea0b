use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec, TriMat};
use tracing::info;

use crate::config::VectorizerConfig;
use crate::error::{Error, Phase, Result};
use crate::features::FeatureMatrix;

/// Splits a cleaned document into tokens and enumerates its n-grams
fn ngrams(document: &str, (min_n, max_n): (usize, usize), min_token_len: usize) -> Vec<String> {
  let tokens: Vec<&str> = document
    .split_whitespace()
    .filter(|t| t.chars().count() >= min_token_len)
    .collect();
  let mut grams: Vec<String> = Vec::new();
  for n in min_n..=max_n {
    for window in tokens.windows(n) {
      grams.push(window.join(" "));
    }
  }
  grams
}

/// TF-IDF Vectorizer
/// Fitting learns a fixed n-gram vocabulary plus smoothed inverse document
/// frequencies, `ln((1 + n) / (1 + df)) + 1`. Rows are L2-normalized and
/// n-grams outside the vocabulary are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfVectorizer {
  max_features: usize,
  ngram_range: (usize, usize),
  min_token_len: usize,
}

impl Default for TfidfVectorizer {
  fn default() -> Self {
    Self::from_config(&VectorizerConfig::default())
  }
}

impl TfidfVectorizer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: &VectorizerConfig) -> Self {
    Self {
      max_features: config.max_features,
      ngram_range: config.ngram_range,
      min_token_len: config.min_token_len,
    }
  }

  #[must_use]
  pub fn with_max_features(mut self, max_features: usize) -> Self {
    self.max_features = max_features;
    self
  }

  #[must_use]
  pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
    self.ngram_range = (min_n, max_n);
    self
  }

  #[must_use]
  pub fn with_min_token_len(mut self, min_token_len: usize) -> Self {
    self.min_token_len = min_token_len;
    self
  }

  fn validate(&self) -> Result<()> {
    if self.max_features == 0 {
      return Err(Error::invalid("max_features", self.max_features, "must be at least 1"));
    }
    let (min_n, max_n) = self.ngram_range;
    if min_n == 0 || min_n > max_n {
      return Err(Error::invalid("ngram_range", format!("({min_n}, {max_n})"), "requires 1 <= min <= max"));
    }
    Ok(())
  }

  /// Fit
  /// Learns the vocabulary and idf weights from a corpus of cleaned documents
  pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> Result<FittedTfidf> {
    self.validate()?;
    if corpus.is_empty() {
      return Err(Error::EmptyCorpus { phase: Phase::Fit });
    }

    let n_docs: usize = corpus.len();
    let mut term_freq: HashMap<String, usize> = HashMap::new();
    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for doc in corpus {
      let grams: Vec<String> = ngrams(doc.as_ref(), self.ngram_range, self.min_token_len);
      let unique: HashSet<&String> = grams.iter().collect();
      for term in unique {
        *doc_freq.entry(term.clone()).or_insert(0) += 1;
      }
      for term in grams {
        *term_freq.entry(term).or_insert(0) += 1;
      }
    }
    if term_freq.is_empty() {
      return Err(Error::EmptyVocabulary);
    }

    // Most frequent first, lexicographic among equals
    let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(self.max_features);

    let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
    terms.sort();

    let idf: Array1<f32> = terms
      .iter()
      .map(|term| {
        let df: f64 = doc_freq.get(term).copied().unwrap_or(0) as f64;
        (((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0) as f32
      })
      .collect();

    let vocabulary: HashMap<String, usize> = terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
    let fingerprint: u64 = fingerprint(&terms, &idf, self.ngram_range, self.min_token_len);

    info!(documents = n_docs, vocabulary = terms.len(), ngram_range = ?self.ngram_range, "fitted tf-idf vocabulary");

    Ok(FittedTfidf {
      terms,
      vocabulary,
      idf,
      ngram_range: self.ngram_range,
      min_token_len: self.min_token_len,
      fingerprint,
    })
  }
}

/// Identifies a fitted vocabulary; two fits over the same terms but different
/// document frequencies get distinct fingerprints
fn fingerprint(terms: &[String], idf: &Array1<f32>, ngram_range: (usize, usize), min_token_len: usize) -> u64 {
  let mut hasher: DefaultHasher = DefaultHasher::new();
  terms.hash(&mut hasher);
  for weight in idf.iter() {
    weight.to_bits().hash(&mut hasher);
  }
  ngram_range.hash(&mut hasher);
  min_token_len.hash(&mut hasher);
  hasher.finish()
}

/// Immutable vocabulary and idf weights learned by [`TfidfVectorizer::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTfidf {
  terms: Vec<String>,
  vocabulary: HashMap<String, usize>,
  idf: Array1<f32>,
  ngram_range: (usize, usize),
  min_token_len: usize,
  fingerprint: u64,
}

impl FittedTfidf {
  pub fn len(&self) -> usize {
    self.terms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.terms.is_empty()
  }

  /// Terms ordered by feature index
  pub fn terms(&self) -> &[String] {
    &self.terms
  }

  pub fn vocabulary(&self) -> &HashMap<String, usize> {
    &self.vocabulary
  }

  pub fn idf(&self) -> &Array1<f32> {
    &self.idf
  }

  pub fn ngram_range(&self) -> (usize, usize) {
    self.ngram_range
  }

  pub fn fingerprint(&self) -> u64 {
    self.fingerprint
  }

  /// L2-normalized tf-idf weights of one document as (index, weight) pairs sorted by index
  fn weights(&self, document: &str) -> Vec<(usize, f32)> {
    let mut counts: HashMap<usize, f32> = HashMap::new();
    for gram in ngrams(document, self.ngram_range, self.min_token_len) {
      if let Some(&index) = self.vocabulary.get(&gram) {
        *counts.entry(index).or_insert(0.0) += 1.0;
      }
    }

    let mut weights: Vec<(usize, f32)> = counts
      .into_iter()
      .map(|(index, count)| (index, count * self.idf[index]))
      .collect();
    weights.sort_by_key(|(index, _)| *index);

    let norm: f32 = weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
      weights.iter_mut().for_each(|(_, w)| *w /= norm);
    }
    weights
  }

  /// Transform
  /// Projects a single cleaned document into the fitted feature space
  pub fn transform_one(&self, document: &str) -> CsVec<f32> {
    let (indices, data): (Vec<usize>, Vec<f32>) = self.weights(document).into_iter().unzip();
    CsVec::new(self.len(), indices, data)
  }

  /// Projects cleaned documents into the fitted feature space, one row each
  pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> FeatureMatrix {
    let mut tri: TriMat<f32> = TriMat::new((documents.len(), self.len()));
    for (row, doc) in documents.iter().enumerate() {
      for (col, weight) in self.weights(doc.as_ref()) {
        tri.add_triplet(row, col, weight);
      }
    }
    let rows: CsMat<f32> = tri.to_csr();
    FeatureMatrix::new(rows, self.fingerprint)
  }
}
