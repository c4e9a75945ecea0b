use dfdx::losses::binary_cross_entropy_with_logits_loss;
use dfdx::optim::{AdamConfig, WeightDecay};
use dfdx::shapes::Const;
use dfdx::tensor::{AsArray, AutoDevice, Cpu, Gradients, Tensor, TensorFromVec, Trace, ZerosTensor};
use dfdx::tensor_ops::{Backward, TryMatMul};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::error::{Error, Phase, Result};
use crate::features::FeatureMatrix;
use crate::labels::Label;
use crate::naive_bayes::MultinomialNb;

type Device = Cpu;
type DType = f32;

/// Weights of a logistic model laid out as one row, bias last
type WeightRow = Tensor<(Const<1>, usize), DType, Device>;

/// Binary text classifier over tf-idf features
pub trait Classifier {
  fn name(&self) -> &'static str;

  /// Learns parameters from (features, labels); refitting replaces them
  fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()>;

  /// Scores rows without touching the learned parameters
  fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>>;

  fn is_fitted(&self) -> bool;
}

/// Shared guard for `fit` inputs
pub(crate) fn check_training_input(features: &FeatureMatrix, labels: &[Label]) -> Result<()> {
  if features.n_rows() == 0 {
    return Err(Error::EmptyCorpus { phase: Phase::Train });
  }
  if features.n_rows() != labels.len() {
    return Err(Error::DimensionMismatch {
      phase: Phase::Train,
      expected: features.n_rows(),
      actual: labels.len(),
    });
  }
  if labels.iter().all(|l| *l == labels[0]) {
    warn!(label = %labels[0], "training split contains a single class");
  }
  Ok(())
}

fn training_error<E: std::fmt::Debug>(err: E) -> Error {
  Error::Training(format!("{:?}", err))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LogisticParams {
  weights: Vec<f32>,
  fingerprint: u64,
}

/// Logistic Regression
/// L2-regularized binary logistic model trained with Adam on mini-batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
  c: f32,
  epochs: usize,
  learning_rate: f32,
  batch_size: usize,
  fitted: Option<LogisticParams>,
}

impl Default for LogisticRegression {
  fn default() -> Self {
    Self::from_config(&ClassifierConfig::default())
  }
}

impl LogisticRegression {
  pub fn from_config(config: &ClassifierConfig) -> Self {
    Self {
      c: config.c,
      epochs: config.epochs,
      learning_rate: config.learning_rate,
      batch_size: config.batch_size,
      fitted: None,
    }
  }

  #[must_use]
  pub fn with_epochs(mut self, epochs: usize) -> Self {
    self.epochs = epochs;
    self
  }

  #[must_use]
  pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
    self.learning_rate = learning_rate;
    self
  }

  /// Learned feature weights followed by the intercept
  pub fn weights(&self) -> Option<&[f32]> {
    self.fitted.as_ref().map(|p| p.weights.as_slice())
  }

  fn params(&self, features: &FeatureMatrix, phase: Phase) -> Result<&LogisticParams> {
    let params: &LogisticParams = self.fitted.as_ref().ok_or(Error::NotFitted { phase })?;
    features.ensure_fingerprint(params.fingerprint, phase)?;
    if params.weights.len() != features.n_features() + 1 {
      return Err(Error::DimensionMismatch {
        phase,
        expected: params.weights.len() - 1,
        actual: features.n_features(),
      });
    }
    Ok(params)
  }

  /// Probability of the positive class for each row
  pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f32>> {
    let params: &LogisticParams = self.params(features, Phase::Predict)?;
    let dev: Device = AutoDevice::default();
    let height: usize = params.weights.len();
    let w: WeightRow = dev.tensor_from_vec(params.weights.clone(), (Const::<1>, height));

    let mut probs: Vec<f32> = Vec::with_capacity(features.n_rows());
    let batch_size: usize = self.batch_size.max(1);
    let mut start: usize = 0;
    while start < features.n_rows() {
      let end: usize = (start + batch_size).min(features.n_rows());
      let x: Tensor<(usize, usize), DType, Device> =
        dev.tensor_from_vec(features.dense_columns(start..end, true), (height, end - start));
      let y_hat: Tensor<(Const<1>, usize), DType, Device> = w.clone().matmul(x).sigmoid();
      probs.extend(y_hat.as_vec());
      start = end;
    }
    Ok(probs)
  }
}

impl Classifier for LogisticRegression {
  fn name(&self) -> &'static str {
    "logistic_regression"
  }

  /// Train Model
  /// Zero-initialized weights, batches visited in row order so runs are repeatable
  fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()> {
    check_training_input(features, labels)?;
    let dev: Device = AutoDevice::default();
    let n_rows: usize = features.n_rows();
    let height: usize = features.n_features() + 1;
    let batch_size: usize = self.batch_size.max(1);

    let mut w: WeightRow = dev.zeros_like(&(Const::<1>, height));
    let config: AdamConfig = AdamConfig {
      lr: f64::from(self.learning_rate),
      weight_decay: Some(WeightDecay::L2(1.0 / (f64::from(self.c) * n_rows as f64))),
      ..Default::default()
    };
    // First and second Adam moments, keyed by the weight tensor
    let mut moment1: Gradients<DType, Device> = Gradients::leaky();
    let mut moment2: Gradients<DType, Device> = Gradients::leaky();
    let mut step: i32 = 0;

    for epoch in 0..self.epochs {
      let mut total_epoch_loss: f32 = 0.0;
      for start in (0..n_rows).step_by(batch_size) {
        let end: usize = (start + batch_size).min(n_rows);
        let x: Tensor<(usize, usize), DType, Device> =
          dev.tensor_from_vec(features.dense_columns(start..end, true), (height, end - start));
        let targets: Vec<f32> = labels[start..end].iter().map(|l| l.as_index() as f32).collect();
        let y: Tensor<(Const<1>, usize), DType, Device> = dev.tensor_from_vec(targets, (Const::<1>, end - start));

        let tape: Gradients<DType, Device> = Gradients::leaky();
        let logits = w.trace(tape).matmul(x);
        let loss = binary_cross_entropy_with_logits_loss(logits, y);
        total_epoch_loss += loss.array();

        let mut grads: Gradients<DType, Device> = loss.backward();
        step += 1;
        let grad = grads.get_or_alloc_mut(&w).map_err(training_error)?;
        let m_t = moment1.get_or_alloc_mut(&w).map_err(training_error)?;
        let v_t = moment2.get_or_alloc_mut(&w).map_err(training_error)?;
        config.try_update(step, &mut w, m_t, v_t, grad).map_err(training_error)?;
      }
      debug!(epoch, loss = total_epoch_loss, "logistic regression epoch");
    }

    info!(rows = n_rows, features = height - 1, epochs = self.epochs, "trained logistic regression");
    self.fitted = Some(LogisticParams { weights: w.as_vec(), fingerprint: features.fingerprint() });
    Ok(())
  }

  fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>> {
    let probs: Vec<f32> = self.predict_proba(features)?;
    Ok(probs.into_iter().map(|p| if p > 0.5 { Label::Positive } else { Label::Negative }).collect())
  }

  fn is_fitted(&self) -> bool {
    self.fitted.is_some()
  }
}

/// Either classifier variant, chosen at configuration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassifierModel {
  NaiveBayes(MultinomialNb),
  LogisticRegression(LogisticRegression),
}

impl ClassifierModel {
  pub fn from_config(config: &ClassifierConfig) -> Self {
    match config.kind {
      ClassifierKind::NaiveBayes => ClassifierModel::NaiveBayes(MultinomialNb::new(config.alpha)),
      ClassifierKind::LogisticRegression => ClassifierModel::LogisticRegression(LogisticRegression::from_config(config)),
    }
  }

  fn inner(&self) -> &dyn Classifier {
    match self {
      ClassifierModel::NaiveBayes(m) => m,
      ClassifierModel::LogisticRegression(m) => m,
    }
  }

  fn inner_mut(&mut self) -> &mut dyn Classifier {
    match self {
      ClassifierModel::NaiveBayes(m) => m,
      ClassifierModel::LogisticRegression(m) => m,
    }
  }
}

impl Classifier for ClassifierModel {
  fn name(&self) -> &'static str {
    self.inner().name()
  }

  fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<()> {
    self.inner_mut().fit(features, labels)
  }

  fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>> {
    self.inner().predict(features)
  }

  fn is_fitted(&self) -> bool {
    self.inner().is_fitted()
  }
}
