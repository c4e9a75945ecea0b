use std::fmt;

use crate::error::{Error, Phase, Result};
use crate::labels::Label;

fn check_lengths(y_true: &[Label], y_pred: &[Label]) -> Result<()> {
  if y_true.len() != y_pred.len() {
    return Err(Error::DimensionMismatch { phase: Phase::Evaluate, expected: y_true.len(), actual: y_pred.len() });
  }
  if y_true.is_empty() {
    return Err(Error::EmptyCorpus { phase: Phase::Evaluate });
  }
  Ok(())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
  if denominator == 0 {
    0.0
  } else {
    numerator as f64 / denominator as f64
  }
}

/// Fraction of exact matches
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64> {
  check_lengths(y_true, y_pred)?;
  let correct: usize = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
  Ok(ratio(correct, y_true.len()))
}

/// 2x2 counts, rows are the true label and columns the prediction,
/// both ordered Negative, Positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
  counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
  pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
    check_lengths(y_true, y_pred)?;
    let mut counts: [[usize; 2]; 2] = [[0; 2]; 2];
    for (t, p) in y_true.iter().zip(y_pred) {
      counts[t.as_index()][p.as_index()] += 1;
    }
    Ok(Self { counts })
  }

  pub fn get(&self, truth: Label, predicted: Label) -> usize {
    self.counts[truth.as_index()][predicted.as_index()]
  }

  pub fn true_negatives(&self) -> usize {
    self.get(Label::Negative, Label::Negative)
  }

  pub fn false_positives(&self) -> usize {
    self.get(Label::Negative, Label::Positive)
  }

  pub fn false_negatives(&self) -> usize {
    self.get(Label::Positive, Label::Negative)
  }

  pub fn true_positives(&self) -> usize {
    self.get(Label::Positive, Label::Positive)
  }

  pub fn total(&self) -> usize {
    self.counts.iter().flatten().sum()
  }

  pub fn as_array(&self) -> [[usize; 2]; 2] {
    self.counts
  }
}

impl fmt::Display for ConfusionMatrix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let width: usize = self.counts.iter().flatten().map(|c| c.to_string().len()).max().unwrap_or(1);
    writeln!(f, "[[{:>w$} {:>w$}]", self.counts[0][0], self.counts[0][1], w = width)?;
    write!(f, " [{:>w$} {:>w$}]]", self.counts[1][0], self.counts[1][1], w = width)
  }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassReport {
  pub precision: f64,
  pub recall: f64,
  pub f1: f64,
  pub support: usize,
}

impl ClassReport {
  fn from_counts(tp: usize, fp: usize, fn_count: usize) -> Self {
    let precision: f64 = ratio(tp, tp + fp);
    let recall: f64 = ratio(tp, tp + fn_count);
    let f1: f64 = if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) };
    Self { precision, recall, f1, support: tp + fn_count }
  }
}

/// Per-class report plus accuracy and averages, printed in the familiar
/// scikit-learn layout
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
  pub classes: [ClassReport; 2],
  pub accuracy: f64,
}

impl ClassificationReport {
  pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
    let matrix: ConfusionMatrix = ConfusionMatrix::new(y_true, y_pred)?;
    Ok(Self::from_confusion(&matrix))
  }

  pub fn from_confusion(m: &ConfusionMatrix) -> Self {
    let negative: ClassReport = ClassReport::from_counts(m.true_negatives(), m.false_negatives(), m.false_positives());
    let positive: ClassReport = ClassReport::from_counts(m.true_positives(), m.false_positives(), m.false_negatives());
    let accuracy: f64 = ratio(m.true_positives() + m.true_negatives(), m.total());
    Self { classes: [negative, positive], accuracy }
  }

  pub fn class(&self, label: Label) -> &ClassReport {
    &self.classes[label.as_index()]
  }

  pub fn support(&self) -> usize {
    self.classes.iter().map(|c| c.support).sum()
  }

  pub fn macro_avg(&self) -> ClassReport {
    let n: f64 = self.classes.len() as f64;
    ClassReport {
      precision: self.classes.iter().map(|c| c.precision).sum::<f64>() / n,
      recall: self.classes.iter().map(|c| c.recall).sum::<f64>() / n,
      f1: self.classes.iter().map(|c| c.f1).sum::<f64>() / n,
      support: self.support(),
    }
  }

  pub fn weighted_avg(&self) -> ClassReport {
    let total: usize = self.support();
    let weighted = |value: fn(&ClassReport) -> f64| -> f64 {
      if total == 0 {
        return 0.0;
      }
      self.classes.iter().map(|c| value(c) * c.support as f64).sum::<f64>() / total as f64
    };
    ClassReport {
      precision: weighted(|c| c.precision),
      recall: weighted(|c| c.recall),
      f1: weighted(|c| c.f1),
      support: total,
    }
  }
}

impl fmt::Display for ClassificationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
    writeln!(f)?;
    for label in Label::ALL {
      let c: &ClassReport = self.class(label);
      writeln!(f, "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}", label.as_index(), c.precision, c.recall, c.f1, c.support)?;
    }
    writeln!(f)?;
    writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.support())?;
    for (name, avg) in [("macro avg", self.macro_avg()), ("weighted avg", self.weighted_avg())] {
      writeln!(f, "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}", name, avg.precision, avg.recall, avg.f1, avg.support)?;
    }
    Ok(())
  }
}

/// Evaluation
/// Accuracy, confusion matrix and per-class report of one run, computed from
/// the true and predicted labels alone
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
  pub accuracy: f64,
  pub confusion: ConfusionMatrix,
  pub report: ClassificationReport,
}

impl Evaluation {
  pub fn new(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
    let confusion: ConfusionMatrix = ConfusionMatrix::new(y_true, y_pred)?;
    let report: ClassificationReport = ClassificationReport::from_confusion(&confusion);
    Ok(Self { accuracy: report.accuracy, confusion, report })
  }

  pub fn correct_percentage(&self) -> f64 {
    self.accuracy * 100.0
  }
}

impl fmt::Display for Evaluation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
    writeln!(f, "Confusion Matrix:")?;
    writeln!(f, "{}", self.confusion)?;
    writeln!(f, "Classification Report:")?;
    write!(f, "{}", self.report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::labels::Label::{Negative as N, Positive as P};

  #[test]
  fn it_counts_every_example_once() {
    let y_true: [Label; 6] = [P, P, P, N, N, N];
    let y_pred: [Label; 6] = [P, P, N, N, P, N];
    let m: ConfusionMatrix = ConfusionMatrix::new(&y_true, &y_pred).unwrap();
    assert_eq!(m.as_array(), [[2, 1], [1, 2]]);
    assert_eq!(m.total(), 6);

    let acc: f64 = accuracy(&y_true, &y_pred).unwrap();
    assert!((acc - (m.true_positives() + m.true_negatives()) as f64 / 6.0).abs() < 1e-12);
  }

  #[test]
  fn it_computes_per_class_scores() {
    let y_true: [Label; 5] = [P, P, P, N, N];
    let y_pred: [Label; 5] = [P, P, N, N, P];
    let report: ClassificationReport = ClassificationReport::new(&y_true, &y_pred).unwrap();

    let pos: &ClassReport = report.class(P);
    assert!((pos.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((pos.recall - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(pos.support, 3);

    let neg: &ClassReport = report.class(N);
    assert!((neg.precision - 0.5).abs() < 1e-12);
    assert!((neg.recall - 0.5).abs() < 1e-12);
    assert!((neg.f1 - 0.5).abs() < 1e-12);
    assert_eq!(report.support(), 5);
    assert!((report.weighted_avg().recall - 0.6).abs() < 1e-12);
  }

  #[test]
  fn it_uses_zero_for_undefined_ratios() {
    let report: ClassificationReport = ClassificationReport::new(&[N, N], &[N, N]).unwrap();
    assert_eq!(report.class(P).precision, 0.0);
    assert_eq!(report.class(P).f1, 0.0);
    assert_eq!(report.accuracy, 1.0);
  }

  #[test]
  fn it_rejects_mismatched_inputs() {
    assert!(matches!(accuracy(&[P], &[P, N]), Err(Error::DimensionMismatch { .. })));
    assert!(matches!(Evaluation::new(&[], &[]), Err(Error::EmptyCorpus { .. })));
  }

  #[test]
  fn it_renders_a_text_report() {
    let eval: Evaluation = Evaluation::new(&[P, N, P, N], &[P, N, N, N]).unwrap();
    let text: String = eval.to_string();
    assert!(text.contains("Accuracy: 0.7500"));
    assert!(text.contains("[[2 0]\n [1 1]]"));
    assert!(text.contains("weighted avg"));
    assert!((eval.correct_percentage() - 75.0).abs() < 1e-9);
  }
}
