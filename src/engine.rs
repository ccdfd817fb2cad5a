use anyhow::{Result, bail};
use std::borrow::Cow;

use crate::types::Sentiment;

/// Sparse row-major feature matrix. Row `i` spans `indptr[i]..indptr[i + 1]`
/// in `indices`/`values`; column indices are sorted within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a row. Entries must be sorted by column and inside `n_features`.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (u32, f32)>) -> Result<()> {
        let entries: Vec<(u32, f32)> = entries.into_iter().collect();
        for (position, &(column, _)) in entries.iter().enumerate() {
            if column as usize >= self.n_features {
                bail!(
                    "column {column} out of range for {} features",
                    self.n_features
                );
            }
            if position > 0 && column <= entries[position - 1].0 {
                bail!("row columns must be strictly increasing");
            }
        }
        for (column, value) in entries {
            self.indices.push(column);
            self.values.push(value);
        }
        self.indptr.push(self.indices.len());
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn row(&self, i: usize) -> (&[u32], &[f32]) {
        let span = self.indptr[i]..self.indptr[i + 1];
        (&self.indices[span.clone()], &self.values[span])
    }

    /// Row id for every stored entry, aligned with `indices()`.
    pub fn row_ids(&self) -> Vec<u32> {
        (0..self.n_rows())
            .flat_map(|row| {
                let len = self.indptr[row + 1] - self.indptr[row];
                std::iter::repeat_n(row as u32, len)
            })
            .collect()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Fitted text → feature transform.
pub trait FeatureTransformer: Send + Sync {
    /// One row per text, in input order.
    fn transform(&self, texts: &[String]) -> Result<FeatureMatrix>;

    fn n_features(&self) -> usize;
}

/// Fitted binary classifier scoring a whole batch at once.
pub trait Classifier: Send + Sync {
    /// One label per matrix row, in row order.
    fn predict_batch(&self, features: &FeatureMatrix) -> Result<Vec<Sentiment>>;
}

/// Per-text preprocessing applied before vectorization.
pub trait TextNormalizer: Send + Sync {
    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TextNormalizer for Identity {
    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}
