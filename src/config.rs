use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where the tabular review dataset lives and how its columns are named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
  pub path: PathBuf,
  pub text_column: String,
  pub label_column: String,
  pub positive_label: String,
  pub negative_label: String,
}

impl Default for DatasetConfig {
  fn default() -> Self {
    Self {
      path: PathBuf::from("data/reviews.csv"),
      text_column: "review".into(),
      label_column: "sentiment".into(),
      positive_label: "positive".into(),
      negative_label: "negative".into(),
    }
  }
}

/// Optional overrides for the bundled stopword and lemma tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
  pub stopwords: Option<PathBuf>,
  pub lemmas: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
  pub max_features: usize,
  pub ngram_range: (usize, usize),
  pub min_token_len: usize,
}

impl Default for VectorizerConfig {
  fn default() -> Self {
    Self { max_features: 5000, ngram_range: (1, 2), min_token_len: 2 }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
  pub test_size: f64,
  pub seed: u64,
}

impl Default for SplitConfig {
  fn default() -> Self {
    Self { test_size: 0.2, seed: 42 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
  NaiveBayes,
  LogisticRegression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
  pub kind: ClassifierKind,
  /// Additive smoothing for naive Bayes
  pub alpha: f64,
  /// Inverse L2 regularization strength for logistic regression
  pub c: f32,
  pub epochs: usize,
  pub learning_rate: f32,
  pub batch_size: usize,
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    Self {
      kind: ClassifierKind::NaiveBayes,
      alpha: 1.0,
      c: 1.0,
      epochs: 100,
      learning_rate: 0.05,
      batch_size: 256,
    }
  }
}

/// Cross-validated sweep over the naive Bayes smoothing parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  pub enabled: bool,
  pub alphas: Vec<f64>,
  pub folds: usize,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self { enabled: false, alphas: vec![0.1, 0.5, 1.0, 2.0, 5.0], folds: 5 }
  }
}

/// Configuration for one training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub dataset: DatasetConfig,
  pub resources: ResourcesConfig,
  pub vectorizer: VectorizerConfig,
  pub split: SplitConfig,
  pub classifier: ClassifierConfig,
  pub search: SearchConfig,
}

impl PipelineConfig {
  /// Loads and validates a TOML configuration file
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let data: String = std::fs::read_to_string(path)?;
    Self::from_toml(&data)
  }

  pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
    let mut data: String = String::new();
    reader.read_to_string(&mut data)?;
    Self::from_toml(&data)
  }

  fn from_toml(data: &str) -> Result<Self> {
    let config: PipelineConfig = toml::from_str(data)?;
    config.validate()?;
    Ok(config)
  }

  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let data: String = toml::to_string(self)?;
    std::fs::write(path, data)?;
    Ok(())
  }

  pub fn save_to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
    let data: String = toml::to_string(self)?;
    writer.write_all(data.as_bytes())?;
    writer.flush()?;
    Ok(())
  }

  /// Rejects out-of-range parameters before any work starts
  pub fn validate(&self) -> Result<()> {
    let v: &VectorizerConfig = &self.vectorizer;
    if v.max_features == 0 {
      return Err(Error::invalid("max_features", v.max_features, "must be at least 1"));
    }
    let (min_n, max_n) = v.ngram_range;
    if min_n == 0 || min_n > max_n {
      return Err(Error::invalid("ngram_range", format!("({min_n}, {max_n})"), "requires 1 <= min <= max"));
    }
    let test_size: f64 = self.split.test_size;
    if !(test_size > 0.0 && test_size < 1.0) {
      return Err(Error::invalid("test_size", test_size, "must lie strictly between 0 and 1"));
    }
    let c: &ClassifierConfig = &self.classifier;
    if !(c.alpha > 0.0) {
      return Err(Error::invalid("alpha", c.alpha, "must be positive"));
    }
    if !(c.c > 0.0) {
      return Err(Error::invalid("c", c.c, "must be positive"));
    }
    if !(c.learning_rate > 0.0) {
      return Err(Error::invalid("learning_rate", c.learning_rate, "must be positive"));
    }
    if c.epochs == 0 {
      return Err(Error::invalid("epochs", c.epochs, "must be at least 1"));
    }
    if c.batch_size == 0 {
      return Err(Error::invalid("batch_size", c.batch_size, "must be at least 1"));
    }
    if self.search.enabled {
      if self.search.alphas.is_empty() {
        return Err(Error::invalid("alphas", "[]", "grid must not be empty"));
      }
      if let Some(bad) = self.search.alphas.iter().find(|a| !(**a > 0.0)) {
        return Err(Error::invalid("alphas", bad, "every grid point must be positive"));
      }
      if self.search.folds < 2 {
        return Err(Error::invalid("folds", self.search.folds, "must be at least 2"));
      }
    }
    Ok(())
  }
}
