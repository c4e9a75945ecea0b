use tracing::{debug, info};

use crate::error::{Error, Phase, Result};
use crate::features::FeatureMatrix;
use crate::labels::Label;
use crate::metrics::accuracy;
use crate::model::Classifier;

/// K-Fold cross-validator over contiguous, unshuffled folds.
/// The first `n % k` folds hold one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
  n_splits: usize,
}

impl KFold {
  pub fn new(n_splits: usize) -> Self {
    Self { n_splits }
  }

  pub fn n_splits(&self) -> usize {
    self.n_splits
  }

  /// (train indices, validation indices) for each fold
  pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if self.n_splits < 2 {
      return Err(Error::invalid("folds", self.n_splits, "must be at least 2"));
    }
    if self.n_splits > n_samples {
      return Err(Error::invalid("folds", self.n_splits, "cannot exceed the number of samples"));
    }

    let fold_size: usize = n_samples / self.n_splits;
    let remainder: usize = n_samples % self.n_splits;
    let mut folds: Vec<(Vec<usize>, Vec<usize>)> = Vec::with_capacity(self.n_splits);
    let mut start: usize = 0;
    for i in 0..self.n_splits {
      let size: usize = if i < remainder { fold_size + 1 } else { fold_size };
      let end: usize = start + size;
      let validation: Vec<usize> = (start..end).collect();
      let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
      folds.push((train, validation));
      start = end;
    }
    Ok(folds)
  }
}

/// Outcome of a sweep over one smoothing parameter
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchResult {
  pub best_param: f64,
  pub best_score: f64,
  pub params: Vec<f64>,
  /// Mean validation accuracy per grid point, aligned with `params`
  pub scores: Vec<f64>,
}

impl GridSearchResult {
  pub fn best_index(&self) -> usize {
    self.params.iter().position(|p| *p == self.best_param).unwrap_or(0)
  }
}

/// Mean validation accuracy of a fresh model on every fold
pub fn cross_val_score<C, F>(features: &FeatureMatrix, labels: &[Label], cv: &KFold, mut build: F) -> Result<f64>
where
  C: Classifier,
  F: FnMut() -> C,
{
  if features.n_rows() != labels.len() {
    return Err(Error::DimensionMismatch { phase: Phase::Select, expected: features.n_rows(), actual: labels.len() });
  }
  let folds: Vec<(Vec<usize>, Vec<usize>)> = cv.split(labels.len())?;
  let mut total: f64 = 0.0;
  for (fold, (train, validation)) in folds.iter().enumerate() {
    let x_train: FeatureMatrix = features.select_rows(train)?;
    let y_train: Vec<Label> = train.iter().map(|&i| labels[i]).collect();
    let x_val: FeatureMatrix = features.select_rows(validation)?;
    let y_val: Vec<Label> = validation.iter().map(|&i| labels[i]).collect();

    let mut model: C = build();
    model.fit(&x_train, &y_train)?;
    let score: f64 = accuracy(&y_val, &model.predict(&x_val)?)?;
    debug!(fold, score, "cross-validation fold");
    total += score;
  }
  Ok(total / folds.len() as f64)
}

/// Grid search over a single parameter, scored by k-fold mean accuracy.
/// Ties keep the first grid point encountered.
pub fn grid_search<C, F>(grid: &[f64], features: &FeatureMatrix, labels: &[Label], cv: &KFold, mut build: F) -> Result<GridSearchResult>
where
  C: Classifier,
  F: FnMut(f64) -> C,
{
  if grid.is_empty() {
    return Err(Error::invalid("alphas", "[]", "grid must not be empty"));
  }

  let mut best_param: f64 = grid[0];
  let mut best_score: f64 = f64::NEG_INFINITY;
  let mut scores: Vec<f64> = Vec::with_capacity(grid.len());
  for &param in grid {
    let score: f64 = cross_val_score(features, labels, cv, || build(param))?;
    debug!(param, score, "grid point");
    if score > best_score {
      best_score = score;
      best_param = param;
    }
    scores.push(score);
  }

  info!(best_param, best_score, "grid search finished");
  Ok(GridSearchResult { best_param, best_score, params: grid.to_vec(), scores })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::naive_bayes::MultinomialNb;
  use crate::vectorizer::TfidfVectorizer;

  #[test]
  fn it_splits_into_contiguous_folds() {
    let folds: Vec<(Vec<usize>, Vec<usize>)> = KFold::new(3).split(7).unwrap();
    let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
    assert_eq!(sizes, vec![3, 2, 2]);
    assert_eq!(folds[1].1, vec![3, 4]);
    assert_eq!(folds[1].0, vec![0, 1, 2, 5, 6]);

    assert!(KFold::new(1).split(7).is_err());
    assert!(KFold::new(8).split(7).is_err());
  }

  #[test]
  fn it_selects_a_grid_point_no_worse_than_any_other() {
    let docs: Vec<&str> = vec![
      "great amazing", "loved great", "amazing fun", "wonderful loved", "great fun",
      "awful boring", "waste awful", "boring terrible", "terrible waste", "awful dull",
    ];
    let labels: Vec<Label> = (0..10).map(|i| if i < 5 { Label::Positive } else { Label::Negative }).collect();
    let fitted = TfidfVectorizer::new().with_ngram_range(1, 1).fit(&docs).unwrap();
    let features: FeatureMatrix = fitted.transform(&docs);

    // interleave so every fold sees both classes
    let order: Vec<usize> = vec![0, 5, 1, 6, 2, 7, 3, 8, 4, 9];
    let features: FeatureMatrix = features.select_rows(&order).unwrap();
    let labels: Vec<Label> = order.iter().map(|&i| labels[i]).collect();

    let grid: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];
    let result: GridSearchResult = grid_search(&grid, &features, &labels, &KFold::new(5), MultinomialNb::new).unwrap();
    assert!(grid.contains(&result.best_param));
    assert_eq!(result.scores.len(), grid.len());
    let worst: f64 = result.scores.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(result.best_score >= worst);
    assert_eq!(result.scores[result.best_index()], result.best_score);
  }

  #[test]
  fn it_keeps_the_first_of_tied_grid_points() {
    let docs: Vec<&str> = vec!["good", "bad", "good", "bad"];
    let labels: Vec<Label> = vec![Label::Positive, Label::Negative, Label::Positive, Label::Negative];
    let features: FeatureMatrix = TfidfVectorizer::new().fit(&docs).unwrap().transform(&docs);
    let result: GridSearchResult = grid_search(&[2.0, 1.0], &features, &labels, &KFold::new(2), MultinomialNb::new).unwrap();
    assert_eq!(result.scores[0], result.scores[1]);
    assert_eq!(result.best_param, 2.0);
  }

  #[test]
  fn it_rejects_an_empty_grid() {
    let docs: Vec<&str> = vec!["good", "bad"];
    let features: FeatureMatrix = TfidfVectorizer::new().fit(&docs).unwrap().transform(&docs);
    let labels: Vec<Label> = vec![Label::Positive, Label::Negative];
    assert!(grid_search(&[], &features, &labels, &KFold::new(2), MultinomialNb::new).is_err());
  }
}
