use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the pipeline an error surfaced in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Normalize,
  Fit,
  Transform,
  Train,
  Predict,
  Evaluate,
  Select,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name: &str = match self {
      Phase::Normalize => "normalize",
      Phase::Fit => "fit",
      Phase::Transform => "transform",
      Phase::Train => "train",
      Phase::Predict => "predict",
      Phase::Evaluate => "evaluate",
      Phase::Select => "select",
    };
    f.write_str(name)
  }
}

#[derive(Error, Debug)]
pub enum Error {
  #[error("{resource} resource unavailable at {path:?}: {source}")]
  ResourceUnavailable {
    resource: &'static str,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("{resource} resource contains no entries")]
  EmptyResource { resource: &'static str },
  #[error("tokenizer failure during {phase}: {message}")]
  Tokenizer { phase: Phase, message: String },

  #[error("dataset is missing column `{column}`")]
  MissingColumn { column: String },
  #[error("invalid label `{value}` at row {row}, expected a binary sentiment")]
  InvalidLabel { row: usize, value: String },
  #[error("dataset has {texts} reviews but {labels} labels")]
  MisalignedColumns { texts: usize, labels: usize },
  #[error("dataset contains no rows")]
  EmptyDataset,
  #[error("cannot read dataset: {0}")]
  Csv(#[from] csv::Error),
  #[error("cannot shape dataset: {0}")]
  CsvShape(#[from] ndarray_csv::ReadError),

  #[error("{phase} called before the model was fitted")]
  NotFitted { phase: Phase },
  #[error("{phase}: features were produced by a different vocabulary than the one the model was trained on")]
  VocabularyMismatch { phase: Phase },
  #[error("{phase}: dimension mismatch, expected {expected}, got {actual}")]
  DimensionMismatch {
    phase: Phase,
    expected: usize,
    actual: usize,
  },
  #[error("invalid value {value} for `{param}`: {constraint}")]
  InvalidParameter {
    param: &'static str,
    value: String,
    constraint: &'static str,
  },
  #[error("{phase}: corpus is empty")]
  EmptyCorpus { phase: Phase },
  #[error("no n-gram survived vocabulary fitting")]
  EmptyVocabulary,

  #[error("optimizer failure: {0}")]
  Training(String),
  #[error("{0}")]
  Io(#[from] std::io::Error),
  #[error("cannot persist model: {0}")]
  Persistence(#[from] bincode::Error),
  #[error("cannot deserialize configuration: {0}")]
  ConfigParse(#[from] toml::de::Error),
  #[error("cannot serialize configuration: {0}")]
  ConfigSerialize(#[from] toml::ser::Error),
}

impl Error {
  pub(crate) fn invalid(param: &'static str, value: impl ToString, constraint: &'static str) -> Self {
    Error::InvalidParameter { param, value: value.to_string(), constraint }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_names_the_failing_phase() {
    let err: Error = Error::NotFitted { phase: Phase::Predict };
    assert_eq!(err.to_string(), "predict called before the model was fitted");

    let err: Error = Error::DimensionMismatch { phase: Phase::Evaluate, expected: 4, actual: 3 };
    assert!(err.to_string().starts_with("evaluate:"));
  }
}
