use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Phase, Result};
use crate::features::FeatureMatrix;
use crate::labels::Label;
use crate::model::{check_training_input, Classifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NbParams {
  /// ln P(class)
  class_log_prior: Array1<f64>,
  /// ln P(feature | class), one row per class
  feature_log_prob: Array2<f64>,
  fingerprint: u64,
}

/// Multinomial naive Bayes over (fractional) feature counts with additive smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
  alpha: f64,
  fitted: Option<NbParams>,
}

impl Default for MultinomialNb {
  fn default() -> Self {
    Self::new(1.0)
  }
}

impl MultinomialNb {
  pub fn new(alpha: f64) -> Self {
    Self { alpha, fitted: None }
  }

  pub fn alpha(&self) -> f64 {
    self.alpha
  }

  fn params(&self, features: &FeatureMatrix, phase: Phase) -> Result<&NbParams> {
    let params: &NbParams = self.fitted.as_ref().ok_or(Error::NotFitted { phase })?;
    features.ensure_fingerprint(params.fingerprint, phase)?;
    if params.feature_log_prob.ncols() != features.n_features() {
      return Err(Error::DimensionMismatch {
        phase,
        expected: params.feature_log_prob.ncols(),
        actual: features.n_features(),
      });
    }
    Ok(params)
  }

  /// Unnormalized log posterior per row: `[ln P(neg, x), ln P(pos, x)]`
  pub fn joint_log_likelihood(&self, features: &FeatureMatrix) -> Result<Array2<f64>> {
    let params: &NbParams = self.params(features, Phase::Predict)?;
    let mut jll: Array2<f64> = Array2::zeros((features.n_rows(), Label::ALL.len()));
    for (i, row) in features.as_csr().outer_iterator().enumerate() {
      for label in Label::ALL {
        let c: usize = label.as_index();
        let evidence: f64 = row
          .iter()
          .map(|(j, &v)| f64::from(v) * params.feature_log_prob[[c, j]])
          .sum();
        jll[[i, c]] = params.class_log_prior[c] + evidence;
      }
    }
    Ok(jll)
  }
}

impl Classifier for MultinomialNb {
  fn name(&self) -> &'static str {
    "naive_bayes"
  }

  fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()> {
    check_training_input(features, labels)?;
    if !(self.alpha > 0.0) {
      return Err(Error::invalid("alpha", self.alpha, "must be positive"));
    }

    let n_classes: usize = Label::ALL.len();
    let mut feature_count: Array2<f64> = Array2::zeros((n_classes, features.n_features()));
    let mut class_count: Array1<f64> = Array1::zeros(n_classes);
    for (row, label) in features.as_csr().outer_iterator().zip(labels) {
      let c: usize = label.as_index();
      class_count[c] += 1.0;
      for (j, &v) in row.iter() {
        feature_count[[c, j]] += f64::from(v);
      }
    }

    let smoothed: Array2<f64> = feature_count + self.alpha;
    let totals: Array1<f64> = smoothed.sum_axis(ndarray::Axis(1));
    let mut feature_log_prob: Array2<f64> = smoothed.mapv(f64::ln);
    for (c, mut row) in feature_log_prob.outer_iter_mut().enumerate() {
      row -= totals[c].ln();
    }
    // An absent class gets ln(0) = -inf and is never predicted
    let class_log_prior: Array1<f64> = class_count.mapv(|n| (n / labels.len() as f64).ln());

    info!(rows = labels.len(), features = features.n_features(), alpha = self.alpha, "trained naive bayes");
    self.fitted = Some(NbParams { class_log_prior, feature_log_prob, fingerprint: features.fingerprint() });
    Ok(())
  }

  /// Argmax of the joint log likelihood; ties go to Negative
  fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>> {
    let jll: Array2<f64> = self.joint_log_likelihood(features)?;
    Ok(jll
      .outer_iter()
      .map(|scores| if scores[1] > scores[0] { Label::Positive } else { Label::Negative })
      .collect())
  }

  fn is_fitted(&self) -> bool {
    self.fitted.is_some()
  }
}
