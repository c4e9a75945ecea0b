use std::ops::Range;

use sprs::{CsMat, CsVecView, TriMat};

use crate::error::{Error, Phase, Result};

/// Sparse TF-IDF rows tagged with the fingerprint of the vocabulary that
/// produced them. Classifiers compare fingerprints so features from a
/// different vocabulary are rejected instead of silently misread.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
  rows: CsMat<f32>,
  fingerprint: u64,
}

impl FeatureMatrix {
  pub(crate) fn new(rows: CsMat<f32>, fingerprint: u64) -> Self {
    Self { rows, fingerprint }
  }

  pub fn n_rows(&self) -> usize {
    self.rows.rows()
  }

  pub fn n_features(&self) -> usize {
    self.rows.cols()
  }

  pub fn fingerprint(&self) -> u64 {
    self.fingerprint
  }

  pub fn as_csr(&self) -> &CsMat<f32> {
    &self.rows
  }

  pub fn row(&self, index: usize) -> Option<CsVecView<'_, f32>> {
    self.rows.outer_view(index)
  }

  /// Rows `indices` in the given order, same vocabulary
  pub fn select_rows(&self, indices: &[usize]) -> Result<FeatureMatrix> {
    let mut tri: TriMat<f32> = TriMat::new((indices.len(), self.n_features()));
    for (new_row, &old_row) in indices.iter().enumerate() {
      let row: CsVecView<'_, f32> = self.row(old_row).ok_or(Error::DimensionMismatch {
        phase: Phase::Select,
        expected: self.n_rows(),
        actual: old_row + 1,
      })?;
      for (col, &value) in row.iter() {
        tri.add_triplet(new_row, col, value);
      }
    }
    Ok(FeatureMatrix::new(tri.to_csr(), self.fingerprint))
  }

  /// Dense, column-major block for the rows in `rows`: one column per document,
  /// `n_features` rows, plus a trailing row of ones when `bias` is set.
  pub fn dense_columns(&self, rows: Range<usize>, bias: bool) -> Vec<f32> {
    let n_cols: usize = rows.len();
    let height: usize = self.n_features() + usize::from(bias);
    let mut data: Vec<f32> = vec![0.0; height * n_cols];
    for (col, row_index) in rows.enumerate() {
      if let Some(row) = self.row(row_index) {
        for (feature, &value) in row.iter() {
          data[feature * n_cols + col] = value;
        }
      }
      if bias {
        data[(height - 1) * n_cols + col] = 1.0;
      }
    }
    data
  }

  pub(crate) fn ensure_fingerprint(&self, expected: u64, phase: Phase) -> Result<()> {
    if self.fingerprint != expected {
      return Err(Error::VocabularyMismatch { phase });
    }
    Ok(())
  }
}
