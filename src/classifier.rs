use anyhow::{Context, Result, bail};
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::path::Path;

use crate::engine::{Classifier, FeatureMatrix};
use crate::types::Sentiment;

const COEF: &str = "coef";
const INTERCEPT: &str = "intercept";

/// Binary logistic regression over sparse count features.
pub struct LogisticRegression {
    coef: Tensor,
    intercept: f32,
    device: Device,
}

impl LogisticRegression {
    pub fn new(coef: Vec<f32>, intercept: f32) -> Result<Self> {
        let device = Device::Cpu;
        let n = coef.len();
        let coef = Tensor::from_vec(coef, n, &device)?;
        Self::from_tensors(coef, intercept, device)
    }

    fn from_tensors(coef: Tensor, intercept: f32, device: Device) -> Result<Self> {
        if coef.elem_count() == 0 {
            bail!("classifier has no coefficients");
        }
        Ok(Self {
            coef,
            intercept,
            device,
        })
    }

    /// Loads `coef` and `intercept` tensors from a safetensors file.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let device = Device::Cpu;
        let mut tensors = candle_core::safetensors::load(path.as_ref(), &device)
            .context("classifier artifact is not a valid safetensors file")?;

        let coef = tensors
            .remove(COEF)
            .with_context(|| format!("classifier artifact has no `{COEF}` tensor"))?;
        let intercept = tensors
            .remove(INTERCEPT)
            .with_context(|| format!("classifier artifact has no `{INTERCEPT}` tensor"))?;

        // A single-class `coef` is stored either flat or as a [1, n] row.
        let dims = coef.dims().to_vec();
        let coef = match dims.as_slice() {
            [_] => coef,
            [1, _] => coef.flatten_all()?,
            dims => bail!("`{COEF}` must have shape [n] or [1, n], got {dims:?}"),
        };
        let coef = coef.to_dtype(DType::F32)?;

        let intercept = intercept.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        let &[intercept] = intercept.as_slice() else {
            bail!("`{INTERCEPT}` must hold exactly one value, got {}", intercept.len());
        };

        tracing::debug!(n_features = coef.elem_count(), intercept, "Classifier loaded");
        Self::from_tensors(coef, intercept, device)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let intercept = Tensor::new(&[self.intercept], &self.device)?;
        let tensors = HashMap::from([
            (COEF.to_string(), self.coef.clone()),
            (INTERCEPT.to_string(), intercept),
        ]);
        candle_core::safetensors::save(&tensors, path.as_ref())?;
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coef.elem_count()
    }

    /// `coef · x + intercept` for every row, gathered and scattered in one pass.
    pub fn decision_function(&self, features: &FeatureMatrix) -> Result<Vec<f32>> {
        if features.n_features() != self.n_features() {
            bail!(
                "feature matrix has {} columns, classifier expects {}",
                features.n_features(),
                self.n_features()
            );
        }

        let n_rows = features.n_rows();
        let scores = Tensor::zeros(n_rows, DType::F32, &self.device)?;
        let scores = if features.nnz() == 0 {
            scores
        } else {
            let columns = Tensor::new(features.indices(), &self.device)?;
            let values = Tensor::new(features.values(), &self.device)?;
            let rows = Tensor::new(features.row_ids().as_slice(), &self.device)?;

            let weighted = self.coef.index_select(&columns, 0)?.mul(&values)?;
            scores.index_add(&rows, &weighted, 0)?
        };

        let scores = scores.affine(1.0, self.intercept as f64)?;
        Ok(scores.to_vec1::<f32>()?)
    }
}

impl Classifier for LogisticRegression {
    fn predict_batch(&self, features: &FeatureMatrix) -> Result<Vec<Sentiment>> {
        let scores = self
            .decision_function(features)
            .context("failed to score feature batch")?;
        Ok(scores.into_iter().map(Sentiment::from_decision).collect())
    }
}
