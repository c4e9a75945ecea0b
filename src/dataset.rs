use std::fs::File;
use std::io::Read;

use csv::{Reader, StringRecord};
use ndarray::Array2;
use ndarray_csv::Array2Reader;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::config::DatasetConfig;
use crate::error::{Error, Result};
use crate::labels::Label;

/// Reviews and their sentiment labels, aligned by row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
  pub texts: Vec<String>,
  pub labels: Vec<Label>,
}

impl Dataset {
  pub fn new(texts: Vec<String>, labels: Vec<Label>) -> Result<Self> {
    if texts.len() != labels.len() {
      return Err(Error::MisalignedColumns { texts: texts.len(), labels: labels.len() });
    }
    Ok(Self { texts, labels })
  }

  pub fn len(&self) -> usize {
    self.texts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.texts.is_empty()
  }

  /// Loads the configured CSV file
  pub fn from_csv(config: &DatasetConfig) -> Result<Self> {
    let file: File = File::open(&config.path)?;
    Self::from_reader(file, config)
  }

  /// Loads review/label columns by header name from any CSV source
  pub fn from_reader<R: Read>(source: R, config: &DatasetConfig) -> Result<Self> {
    let mut reader: Reader<R> = Reader::from_reader(source);
    let headers: StringRecord = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
      headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::MissingColumn { column: name.to_string() })
    };
    let text_column: usize = column(&config.text_column)?;
    let label_column: usize = column(&config.label_column)?;

    let data: Array2<String> = reader.deserialize_array2_dynamic()?;
    if data.nrows() == 0 {
      return Err(Error::EmptyDataset);
    }

    let texts: Vec<String> = data.column(text_column).to_vec();
    let labels: Vec<Label> = data
      .column(label_column)
      .iter()
      .enumerate()
      .map(|(row, value)| parse_label(value, row + 1, config))
      .collect::<Result<Vec<Label>>>()?;

    info!(rows = texts.len(), "loaded dataset");
    Ok(Self { texts, labels })
  }

  /// Rows at `indices`, in that order
  pub fn subset(&self, indices: &[usize]) -> Dataset {
    Dataset {
      texts: indices.iter().map(|&i| self.texts[i].clone()).collect(),
      labels: indices.iter().map(|&i| self.labels[i]).collect(),
    }
  }

  /// Perform train, test, split on your data, reproducibly for a given seed
  pub fn train_test_split(&self, test_size: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    let (train, test) = split_indices(self.len(), test_size, seed)?;
    let train: Dataset = self.subset(&train);
    let test: Dataset = self.subset(&test);
    assert_eq!(train.len() + test.len(), self.len());
    info!(train = train.len(), test = test.len(), seed, "split dataset");
    Ok((train, test))
  }

  /// Count of (negative, positive) rows
  pub fn class_counts(&self) -> [usize; 2] {
    let mut counts: [usize; 2] = [0, 0];
    for label in &self.labels {
      counts[label.as_index()] += 1;
    }
    counts
  }
}

fn parse_label(value: &str, row: usize, config: &DatasetConfig) -> Result<Label> {
  let value: &str = value.trim();
  if value == "1" || value.eq_ignore_ascii_case(&config.positive_label) {
    Ok(Label::Positive)
  } else if value == "0" || value.eq_ignore_ascii_case(&config.negative_label) {
    Ok(Label::Negative)
  } else {
    Err(Error::InvalidLabel { row, value: value.to_string() })
  }
}

/// Shuffled (train, test) row indices; `n_test = ceil(n * test_size)`
pub fn split_indices(n_samples: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
  if !(test_size > 0.0 && test_size < 1.0) {
    return Err(Error::invalid("test_size", test_size, "must lie strictly between 0 and 1"));
  }
  let n_test: usize = (n_samples as f64 * test_size).ceil() as usize;
  let n_train: usize = n_samples.saturating_sub(n_test);
  if n_test == 0 || n_train == 0 {
    return Err(Error::invalid("test_size", test_size, "split would leave the train or test side empty"));
  }

  let mut indices: Vec<usize> = (0..n_samples).collect();
  let mut rng: StdRng = StdRng::seed_from_u64(seed);
  indices.shuffle(&mut rng);

  let test: Vec<usize> = indices[..n_test].to_vec();
  let train: Vec<usize> = indices[n_test..].to_vec();
  Ok((train, test))
}

#[cfg(test)]
mod tests {
  use super::*;

  const CSV: &str = "review,sentiment\n\"Great, really great\",positive\nAwful,negative\nFine,1\nBad,0\n";

  #[test]
  fn it_loads_columns_by_name() {
    let data: Dataset = Dataset::from_reader(CSV.as_bytes(), &DatasetConfig::default()).unwrap();
    assert_eq!(data.len(), 4);
    assert_eq!(data.texts[0], "Great, really great");
    assert_eq!(data.labels, vec![Label::Positive, Label::Negative, Label::Positive, Label::Negative]);
    assert_eq!(data.class_counts(), [2, 2]);
  }

  #[test]
  fn it_reports_schema_errors() {
    let config: DatasetConfig = DatasetConfig { text_column: "text".into(), ..Default::default() };
    let err: Error = Dataset::from_reader(CSV.as_bytes(), &config).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { ref column } if column == "text"));

    let bad: &str = "review,sentiment\nok,positive\nmeh,neutral\n";
    let err: Error = Dataset::from_reader(bad.as_bytes(), &DatasetConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidLabel { row: 2, ref value } if value == "neutral"));

    let empty: &str = "review,sentiment\n";
    assert!(Dataset::from_reader(empty.as_bytes(), &DatasetConfig::default()).is_err());
  }

  #[test]
  fn it_rejects_misaligned_columns() {
    let err: Error = Dataset::new(vec!["good".to_string(), "bad".to_string()], vec![Label::Positive]).unwrap_err();
    assert!(matches!(err, Error::MisalignedColumns { texts: 2, labels: 1 }));
    assert_eq!(err.to_string(), "dataset has 2 reviews but 1 labels");
  }

  #[test]
  fn it_splits_reproducibly() {
    let (train_a, test_a) = split_indices(50, 0.2, 42).unwrap();
    let (train_b, test_b) = split_indices(50, 0.2, 42).unwrap();
    assert_eq!(train_a, train_b);
    assert_eq!(test_a, test_b);
    assert_eq!(test_a.len(), 10);
    assert_eq!(train_a.len(), 40);

    let mut all: Vec<usize> = train_a.iter().chain(test_a.iter()).copied().collect();
    all.sort();
    assert_eq!(all, (0..50).collect::<Vec<usize>>());

    let (_, test_c) = split_indices(50, 0.2, 7).unwrap();
    assert_ne!(test_a, test_c);
  }

  #[test]
  fn it_rejects_degenerate_splits() {
    assert!(split_indices(1, 0.2, 42).is_err());
    assert!(split_indices(10, 0.0, 42).is_err());
    assert!(split_indices(10, 1.0, 42).is_err());
  }
}
